use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

use crate::response::Envelope;

/// Standard error type for the Bint framework.
#[derive(Debug, Error)]
pub enum BintError {
    /// A path parameter or request body could not be bound.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    /// The operation declares a scalar kind the binder cannot produce.
    #[error("unsupported parameter type: {0}")]
    UnsupportedParameter(String),

    /// An operation or middleware signalled failure.
    #[error("{0}")]
    Handler(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BintError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BintError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BintError::NotFound(_) => StatusCode::NOT_FOUND,
            // Failures reported by operations travel inside the envelope.
            BintError::Handler(_) => StatusCode::OK,
            BintError::Internal(_)
            | BintError::UnsupportedParameter(_)
            | BintError::Database(_)
            | BintError::Cache(_)
            | BintError::Config(_)
            | BintError::Startup(_)
            | BintError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a handler failure carrying `message`.
    pub fn handler(message: impl fmt::Display) -> Self {
        BintError::Handler(message.to_string())
    }
}

impl axum::response::IntoResponse for BintError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Envelope::failure(-1, self.to_string());
        (status, axum::Json(body)).into_response()
    }
}

/// A single problem found while compiling controllers into routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// The operation has no parameters, or its first one is not the context.
    MissingContext { controller: String, operation: String },
    /// The context parameter appears after position 0.
    MisplacedContext {
        controller: String,
        operation: String,
        index: usize,
    },
    /// Something follows the request-body parameter.
    BodyNotLast { controller: String, operation: String },
    /// Two operations compile to the same method and path.
    DuplicateRoute { method: String, path: String },
    UnsupportedVerb { verb: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MissingContext {
                controller,
                operation,
            } => write!(
                f,
                "{controller}::{operation}: method must take bint Context as the first parameter"
            ),
            ConfigIssue::MisplacedContext {
                controller,
                operation,
                index,
            } => write!(
                f,
                "{controller}::{operation}: Context found at parameter {index}, it must be the first parameter"
            ),
            ConfigIssue::BodyNotLast {
                controller,
                operation,
            } => write!(
                f,
                "{controller}::{operation}: the request body must be the last parameter"
            ),
            ConfigIssue::DuplicateRoute { method, path } => {
                write!(f, "duplicate route: {method} {path}")
            }
            ConfigIssue::UnsupportedVerb { verb } => write!(f, "unsupported method: {verb}"),
        }
    }
}

/// Fatal startup error: every configuration issue found in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct StartupError {
    pub issues: Vec<ConfigIssue>,
}

impl StartupError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        StartupError { issues }
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} route configuration error(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}
