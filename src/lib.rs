// Client-local chat simulation engine
pub mod models;
pub mod error;
pub mod config;
pub mod clock;
pub mod scheduler;
pub mod store;
pub mod delivery;
pub mod presence;
pub mod status;
pub mod calls;
pub mod queries;
pub mod seed;
pub mod persistence;
pub mod engine;
pub mod driver;
pub mod commands;

// Re-export main types for convenience
pub use models::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SimConfig;
pub use engine::{Engine, EngineEvent, SharedEngine};
pub use error::{EchoError, Result};
