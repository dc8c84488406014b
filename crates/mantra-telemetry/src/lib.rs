//! # Mantra Telemetry
//!
//! Structured logging for the master coordinator and the asset workers.
//! Everything below is plain `tracing`; this crate only decides where the
//! events go and in which format.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mantra_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MANTRA_LOG_LEVEL` / `RUST_LOG` | `info` | `EnvFilter` directive |
//! | `MANTRA_JSON_LOGS` | `false` (`true` in containers) | JSON formatter instead of pretty text |
//! | `MANTRA_CONSOLE_OUTPUT` | `true` | Write events to stdout at all |
//! | `MANTRA_SERVICE_NAME` | `mantra` | Reported in the startup event |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter { directive: String, reason: String },

    /// A global subscriber was already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Emit an event tagged with the component that produced it.
///
/// ```rust,ignore
/// log_event!(info, "registry", "Worker registered", service_id = %id);
/// ```
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Emit an event about one bus request, with the id as a display field.
#[macro_export]
macro_rules! log_request_event {
    ($level:ident, $component:expr, $msg:expr, $request_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            request_id = %$request_id,
            $($($field)*,)?
            $msg
        )
    };
}
