//! # symsrc utilities
//!
//! Shared logging setup for the symsrc workspace, built on `tracing`.
//!
//! `symsrc-core` only emits events; embedding programs pick the output with
//! one of the initializers re-exported here.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_from, init_logging_with_level, LogFormat, LogLevel, LogSettings, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
