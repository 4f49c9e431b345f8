use anyhow::Result;
use std::io::Write;
use log::{LevelFilter, Record};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use chrono::{DateTime, Local};

// Logging setup and small terminal helpers for the binary.

// Where log lines go. The REPL owns stdout, so the binary always logs to a file.
enum Sink {
    File(Mutex<File>),
    Stdout,
}

pub struct LineLogger {
    sink: Sink,
}

impl LineLogger {
    pub fn new(log_file_path: Option<&Path>) -> Result<Self> {
        let sink = match log_file_path {
            Some(path) => Sink::File(Mutex::new(OpenOptions::new().create(true).append(true).open(path)?)),
            None => Sink::Stdout,
        };

        Ok(LineLogger { sink })
    }
}

// `[time] LEVEL [file:line] message`
fn format_line(now: DateTime<Local>, record: &Record) -> String {
    format!(
        "[{}] {} [{}:{}] {}\n",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.args()
    )
}

impl log::Log for LineLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(Local::now(), record);
        match &self.sink {
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(line.as_bytes());
                }
            }
            Sink::Stdout => print!("{}", line),
        }
    }

    fn flush(&self) {
        match &self.sink {
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.flush();
                }
            }
            Sink::Stdout => {
                let _ = std::io::stdout().flush();
            }
        }
    }
}

pub fn setup_logging(log_file: Option<&Path>, level: LevelFilter) -> Result<()> {
    let logger = LineLogger::new(log_file)?;
    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))?;

    log::info!("echochat {} starting, log level {}", env!("CARGO_PKG_VERSION"), level);
    if let Some(path) = log_file {
        log::debug!("Logging to {}", path.display());
    }

    Ok(())
}

/// Shorten text for one-line previews, appending an ellipsis when cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Print a prompt without a trailing newline
pub fn prompt(label: &str) {
    print!("{}> ", label);
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_line_carries_level_location_and_text() {
        let now = Local::now();
        let line = format_line(
            now,
            &Record::builder()
                .args(format_args!("reply queued"))
                .level(log::Level::Warn)
                .file(Some("src/presence.rs"))
                .line(Some(42))
                .build(),
        );
        assert!(line.starts_with(&format!("[{}]", now.format("%Y-%m-%d %H:%M:%S%.3f"))));
        assert!(line.ends_with(" WARN [src/presence.rs:42] reply queued\n"));
    }

    #[test]
    fn file_sink_appends_lines() {
        use log::Log;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echochat.log");
        let logger = LineLogger::new(Some(&path)).unwrap();
        log::set_max_level(LevelFilter::Error);
        logger.log(&Record::builder().args(format_args!("saved snapshots")).level(log::Level::Error).build());
        logger.flush();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ERROR [unknown:0] saved snapshots"));
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
    }
}
