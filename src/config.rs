// Simulation configuration
//
// Values come from (lowest to highest precedence) the built-in defaults,
// an optional JSON file, ECHOCHAT_* environment variables and finally
// whatever the binary sets from its command line.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{EchoError, Result};

pub const ENV_SEED: &str = "ECHOCHAT_SEED";
pub const ENV_DATA_DIR: &str = "ECHOCHAT_DATA_DIR";
pub const ENV_USER_NAME: &str = "ECHOCHAT_USER_NAME";

/// Longest offset any simulated step may use
pub const MAX_OFFSET_MS: u64 = 60 * 60 * 1000;

/// Offsets from the send instant at which each delivery step lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryTimings {
    pub sent_ms: u64,
    pub delivered_ms: u64,
    pub seen_ms: u64,
}

impl Default for DeliveryTimings {
    fn default() -> Self {
        DeliveryTimings {
            sent_ms: 500,
            delivered_ms: 1000,
            seen_ms: 2000,
        }
    }
}

/// Counterparty behaviour timings, all measured from the send instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceTimings {
    pub typing_ms: u64,
    pub reply_min_ms: u64,
    pub reply_max_ms: u64,
}

impl Default for PresenceTimings {
    fn default() -> Self {
        PresenceTimings {
            typing_ms: 1500,
            reply_min_ms: 3000,
            reply_max_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub delivery: DeliveryTimings,
    pub presence: PresenceTimings,
    // Fixed seed for reproducible replies; entropy when absent
    pub seed: Option<u64>,
    pub user_name: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            delivery: DeliveryTimings::default(),
            presence: PresenceTimings::default(),
            seed: None,
            user_name: "You".to_string(),
            data_dir: None,
        }
    }
}

impl SimConfig {
    /// Load the config file (if any), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let file = File::open(path)?;
                let config: SimConfig = serde_json::from_reader(file)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                SimConfig::default()
            }
            None => SimConfig::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(seed) = env::var(ENV_SEED) {
            match seed.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(e) => warn!("Ignoring {}='{}': {}", ENV_SEED, seed, e),
            }
        }
        if let Ok(dir) = env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(name) = env::var(ENV_USER_NAME) {
            if !name.trim().is_empty() {
                self.user_name = name.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.delivery;
        if !(d.sent_ms < d.delivered_ms && d.delivered_ms < d.seen_ms) {
            return Err(EchoError::InvalidConfig(format!(
                "delivery offsets must be strictly increasing (got {}/{}/{})",
                d.sent_ms, d.delivered_ms, d.seen_ms
            )));
        }
        let p = &self.presence;
        let offsets = [
            ("delivery.sent_ms", d.sent_ms),
            ("delivery.delivered_ms", d.delivered_ms),
            ("delivery.seen_ms", d.seen_ms),
            ("presence.typing_ms", p.typing_ms),
            ("presence.reply_min_ms", p.reply_min_ms),
            ("presence.reply_max_ms", p.reply_max_ms),
        ];
        if let Some((name, value)) = offsets.iter().find(|(_, value)| *value > MAX_OFFSET_MS) {
            return Err(EchoError::InvalidConfig(format!(
                "{} ({}) exceeds the {}ms limit",
                name, value, MAX_OFFSET_MS
            )));
        }
        if p.reply_min_ms > p.reply_max_ms {
            return Err(EchoError::InvalidConfig(format!(
                "reply_min_ms ({}) exceeds reply_max_ms ({})",
                p.reply_min_ms, p.reply_max_ms
            )));
        }
        // Typing has to start before the reply lands and clears it
        if p.typing_ms > p.reply_min_ms {
            return Err(EchoError::InvalidConfig(format!(
                "typing_ms ({}) exceeds reply_min_ms ({})",
                p.typing_ms, p.reply_min_ms
            )));
        }
        if self.user_name.trim().is_empty() {
            return Err(EchoError::InvalidConfig("user_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the directory snapshots live in, creating it when needed
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir().ok_or(EchoError::NoDataDir)?.join("echochat"),
        };

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_simulated_timings() {
        let config = SimConfig::default();
        assert_eq!(config.delivery.sent_ms, 500);
        assert_eq!(config.delivery.delivered_ms, 1000);
        assert_eq!(config.delivery.seen_ms, 2000);
        assert_eq!(config.presence.typing_ms, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{ "presence": {{ "typing_ms": 10 }} }}"#).unwrap();

        let config = SimConfig::load(Some(&path)).unwrap();
        assert_eq!(config.presence.typing_ms, 10);
        assert_eq!(config.presence.reply_min_ms, 3000);
        assert_eq!(config.delivery, DeliveryTimings::default());
    }

    #[test]
    fn rejects_non_monotonic_delivery_offsets() {
        let mut config = SimConfig::default();
        config.delivery.delivered_ms = config.delivery.seen_ms;
        assert!(matches!(config.validate(), Err(EchoError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_reply_window() {
        let mut config = SimConfig::default();
        config.presence.reply_min_ms = 6000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_typing_that_starts_after_the_reply() {
        let mut config = SimConfig::default();
        config.presence.typing_ms = 4000;
        config.presence.reply_min_ms = 3000;
        config.presence.reply_max_ms = 3000;
        assert!(matches!(config.validate(), Err(EchoError::InvalidConfig(_))));

        config.presence.typing_ms = 3000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_offsets_beyond_an_hour() {
        let mut config = SimConfig::default();
        config.delivery.seen_ms = u64::MAX / 2;
        assert!(matches!(config.validate(), Err(EchoError::InvalidConfig(_))));

        let mut config = SimConfig::default();
        config.presence.reply_max_ms = MAX_OFFSET_MS + 1;
        assert!(config.validate().is_err());

        config.presence.reply_max_ms = MAX_OFFSET_MS;
        assert!(config.validate().is_ok());
    }
}
