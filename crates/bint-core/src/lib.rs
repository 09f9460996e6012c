pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod controller;
pub mod db;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod response;
pub mod routing;
pub mod testing;

pub use app::App;
pub use cache::CacheService;
pub use config::Config;
pub use context::Context;
pub use controller::{middleware, Body, Controller, Middleware, Operation, RouteGroup};
pub use error::{BintError, ConfigIssue, StartupError};
pub use response::{Envelope, IntoReply, Json, Reply};
pub use testing::{TestApp, TestClient, TestResponse};

// Re-export axum so applications can write middleware without depending on it directly
pub use axum;
pub use axum::extract::Request;
pub use axum::middleware::Next;
pub use axum::response::Response;
