//! # AMOP Telemetry
//!
//! Logging bootstrap for processes embedding the AMOP core.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use amop_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config).expect("Failed to init logging");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AMOP_SERVICE_NAME` | `amop` | Service name in log lines |
//! | `AMOP_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `AMOP_JSON_LOGS` | `false` | JSON output (defaults to true in containers) |
//! | `AMOP_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The configured level string is not a valid `EnvFilter` directive
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
