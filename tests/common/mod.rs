// Common test utilities for integration tests
// This module contains shared code for all integration tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use log::LevelFilter;

use echochat::{
    models::{DeliveryStatus, Message},
    Engine, EngineEvent, ManualClock, SimConfig,
};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Fixed start instant for every simulated run
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
}

pub fn config(seed: u64) -> SimConfig {
    SimConfig {
        seed: Some(seed),
        ..SimConfig::default()
    }
}

/// A seeded engine on a hand-driven clock
pub fn engine_with_seed(seed: u64) -> (Engine, ManualClock) {
    setup_logging();
    let clock = ManualClock::new(t0());
    let engine = Engine::new(config(seed), Arc::new(clock.clone()));
    (engine, clock)
}

pub fn engine() -> (Engine, ManualClock) {
    engine_with_seed(42)
}

/// Advance the clock in steps, collecting whatever fires along the way
pub fn run_for(engine: &mut Engine, clock: &ManualClock, total_ms: i64, step_ms: i64) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    let mut elapsed = 0;
    while elapsed < total_ms {
        clock.advance_ms(step_ms);
        elapsed += step_ms;
        events.extend(engine.run_due());
    }
    events
}

pub fn status_of(engine: &Engine, message_id: &str) -> Option<DeliveryStatus> {
    engine.chats().message(message_id).map(|m| m.status)
}

/// Inbound, non-system messages of a conversation
pub fn replies<'a>(engine: &'a Engine, contact_id: &str) -> Vec<&'a Message> {
    engine
        .chats()
        .conversation(contact_id)
        .filter(|m| m.is_inbound())
        .collect()
}
