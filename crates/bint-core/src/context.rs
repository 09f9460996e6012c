use axum::http::{request::Parts, HeaderMap, Method, Request, Uri};
use sea_orm::DatabaseConnection;
use tracing::Span;

use crate::cache::CacheService;
use crate::logging;
use crate::response::{Envelope, IntoReply};

/// Collaborator handles shared by every request.
#[derive(Clone)]
pub struct Shared {
    pub db: DatabaseConnection,
    pub cache: CacheService,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Shared {
    pub fn new(db: DatabaseConnection, cache: CacheService, body_limit: usize) -> Self {
        Shared {
            db,
            cache,
            body_limit,
        }
    }

    /// Build a fresh context for a request that has been split into parts.
    pub fn context(&self, parts: &Parts) -> Context {
        self.build(&parts.method, &parts.uri, &parts.headers)
    }

    /// Build a fresh context for a request that is still whole.
    pub fn context_for<B>(&self, req: &Request<B>) -> Context {
        self.build(req.method(), req.uri(), req.headers())
    }

    fn build(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Context {
        let request_id = headers
            .get(logging::REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let log = logging::request_span(method, uri.path(), request_id.as_deref());
        Context {
            method: method.clone(),
            uri: uri.clone(),
            headers: headers.clone(),
            request_id,
            db: self.db.clone(),
            cache: self.cache.clone(),
            log,
        }
    }
}

/// Per-request handle bundle injected as an operation's first argument.
///
/// ```rust,ignore
/// Operation::new("Get", |ctx: Context, id: i64| async move {
///     tracing::info!(parent: &ctx.log, id, "loading user");
///     let user = User::find_by_id(id).one(&ctx.db).await?;
///     Ok::<_, BintError>(user.map(Json))
/// })
/// ```
#[derive(Clone)]
pub struct Context {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    request_id: Option<String>,
    pub db: DatabaseConnection,
    pub cache: CacheService,
    /// Logger handle scoped to this request.
    pub log: Span,
}

impl Context {
    /// A context that belongs to no request, wired to a disconnected
    /// database and an in-memory cache. Useful for tests and background jobs.
    pub fn detached() -> Self {
        Context {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            request_id: None,
            db: DatabaseConnection::Disconnected,
            cache: CacheService::in_memory(),
            log: Span::none(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query-string parameter.
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Format a result into the response envelope.
    pub fn ret(&self, value: impl IntoReply) -> Envelope {
        value.into_reply().into_envelope()
    }
}
