//! Logging and tracing initialization for Bint.
//!
//! Building an [`App`](crate::App) never installs a global subscriber;
//! call one of the `init_logging*` functions from `main` first.
//!
//! ```rust,no_run
//! use bint_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_yaml("config.yaml")?;
//!     init_logging_json(config.log_level);
//!
//!     App::new(config).await?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! `RUST_LOG` takes precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=bint_core=debug,tower_http=debug,sqlx=warn cargo run
//! ```

use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::Deserialize;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Header carrying the request id set by the request-id layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Minimum level of emitted events.
///
/// Parsing is case-insensitive and lenient: `fatal` maps to `error`, and
/// anything unknown to `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" | "fatal" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    /// The directive understood by [`EnvFilter`].
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<String> for LogLevel {
    fn from(s: String) -> Self {
        LogLevel::parse(&s)
    }
}

impl FromStr for LogLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LogLevel::parse(s))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialize human-readable logging at `info` (or `RUST_LOG`).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    init_logging_with_level(LogLevel::Info);
}

/// Initialize human-readable logging at the given level.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize JSON-formatted logging (recommended for production).
///
/// One JSON object per line, with the request span fields attached to every
/// event emitted while handling a request.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_json(level: LogLevel) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();
}

/// Initialize pretty-formatted logging (recommended for development).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_pretty() {
    tracing_subscriber::registry()
        .with(filter(LogLevel::Debug))
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true),
        )
        .init();
}

/// The logger handle of one request.
pub fn request_span(method: &Method, path: &str, request_id: Option<&str>) -> Span {
    tracing::info_span!(
        "request",
        method = %method,
        path = %path,
        rid = request_id.unwrap_or_default(),
    )
}
