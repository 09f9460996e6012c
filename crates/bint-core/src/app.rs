use std::sync::Arc;

use axum::http::{header, StatusCode, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

use crate::cache::CacheService;
use crate::config::Config;
use crate::context::Shared;
use crate::controller::{Controller, Middleware};
use crate::error::{BintError, StartupError};
use crate::logging::REQUEST_ID_HEADER;
use crate::response::Envelope;
use crate::routing::compiler::{intercept, intercept_state};
use crate::routing::{RouteCompiler, RouteTable};

/// The main Bint application.
///
/// ```rust,ignore
/// let app = App::new(Config::from_yaml("config.yaml")?)
///     .await?
///     .controller(UserController)?
///     .migrate::<Migrator>()
///     .await?;
/// app.run().await?;
/// ```
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    pub cache: CacheService,
    middleware: Vec<Middleware>,
    controllers: Vec<Arc<dyn Controller>>,
    table: RouteTable,
}

impl App {
    /// Connect the database and cache described by `config`.
    pub async fn new(config: Config) -> Result<Self, BintError> {
        let db = crate::db::connect(config.postgres.as_ref()).await?;
        let cache = CacheService::connect(config.redis.as_ref()).await?;
        Ok(Self::with_collaborators(config, db, cache))
    }

    /// Build an application around already-open collaborators.
    pub fn with_collaborators(config: Config, db: DatabaseConnection, cache: CacheService) -> Self {
        App {
            config,
            db,
            cache,
            middleware: Vec::new(),
            controllers: Vec::new(),
            table: RouteTable::default(),
        }
    }

    /// Register a controller.
    ///
    /// The whole controller set is recompiled, so a malformed operation or a
    /// route clashing with an earlier controller fails here, before anything
    /// is served.
    pub fn controller(self, controller: impl Controller) -> Result<Self, StartupError> {
        self.controllers(vec![Arc::new(controller)])
    }

    /// Register several controllers at once.
    pub fn controllers(mut self, controllers: Vec<Arc<dyn Controller>>) -> Result<Self, StartupError> {
        self.controllers.extend(controllers);
        self.table = RouteCompiler::compile(&self.controllers)?;
        for route in self.table.routes() {
            tracing::debug!(target: "bint::routes", "{route}");
        }
        Ok(self)
    }

    /// Add an application-wide middleware; it runs before any group
    /// middleware. The first one added runs first.
    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    /// Run pending migrations.
    pub async fn migrate<M: MigratorTrait>(self) -> Result<Self, BintError> {
        tracing::info!("Running pending database migrations...");
        M::up(&self.db, None).await?;
        tracing::info!("Migrations complete.");
        Ok(self)
    }

    /// The compiled route table.
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    pub fn shared(&self) -> Shared {
        Shared::new(self.db.clone(), self.cache.clone(), self.config.body_limit)
    }

    /// Build the axum router: compiled routes wrapped in the global
    /// middleware and the outer layers.
    pub fn router(&self) -> Router {
        let shared = self.shared();
        let mut router = self.table.router(&shared).fallback(not_found);

        for mw in self.middleware.iter().rev() {
            router = router.layer(from_fn_with_state(intercept_state(mw, &shared), intercept));
        }

        let x_request_id = axum::http::HeaderName::from_static(REQUEST_ID_HEADER);
        router
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                    .on_response(
                        DefaultOnResponse::new()
                            .level(tracing::Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
            .layer(CorsLayer::permissive())
            .layer(CatchPanicLayer::custom(panic_envelope))
    }

    /// Bind the configured address and serve until Ctrl+C.
    pub async fn run(self) -> Result<(), BintError> {
        let addr = self.config.listen_addr();
        let router = self.router();

        tracing::debug!(routes_len = self.table.len(), "bint routes compiled");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Bint server running on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down Bint server...");
}

async fn not_found(uri: Uri) -> Response {
    let body = Envelope::failure(-1, format!("Cannot find {}", uri.path()));
    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

fn panic_envelope(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");

    let body = Envelope::failure(-1, "internal server error");
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json")],
        bytes,
    )
        .into_response()
}
