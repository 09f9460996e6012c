//! Bint prelude: import everything a controller needs with one line.
//!
//! ```rust,ignore
//! use bint_core::prelude::*;
//! ```

// ── Core types ─────────────────────────────────────────────────
pub use crate::App;
pub use crate::BintError;
pub use crate::CacheService;
pub use crate::Config;
pub use crate::Context;

// ── Controllers ────────────────────────────────────────────────
pub use crate::controller::{middleware, Body, Controller, Middleware, Operation, RouteGroup};

// ── Replies ────────────────────────────────────────────────────
pub use crate::response::{Envelope, IntoReply, Json, Reply};

// ── Middleware plumbing ────────────────────────────────────────
pub use crate::{Next, Request, Response};

// ── Logging ────────────────────────────────────────────────────
pub use crate::logging::{init_logging, init_logging_json, init_logging_pretty, LogLevel};

pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
