//! Concurrent HTTP GET flood with progress reporting and cooperative
//! cancellation.
//!
//! A [`DispatchEngine`] fires a fixed number of GET requests at one URL,
//! all at once, over a single pooled client. Progress is reported through a
//! callback roughly every 1% of completions and once more when the last
//! request finishes. Failed requests are logged and counted like any other.

mod config;
mod engine;
mod error;
mod fanout;
mod progress;

pub use config::{EngineConfig, DEFAULT_REQUEST_TIMEOUT};
pub use engine::{DispatchEngine, RunOutcome, RunState};
pub use error::{ConfigError, EngineError};
