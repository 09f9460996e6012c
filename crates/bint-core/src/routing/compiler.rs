use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use bytes::Bytes;
use tracing::Instrument;

use super::binder::{self, Incoming, PathParams};
use super::signature::{self, ParamType, SignatureError, Verb};
use crate::context::Shared;
use crate::controller::{Controller, Middleware, RawHandler, SETUP};
use crate::error::{BintError, ConfigIssue, StartupError};
use crate::response::Reply;

/// One registered route: an operation bound to a method and full path.
#[derive(Clone)]
pub struct CompiledRoute {
    pub verb: Verb,
    /// Group prefix + route path, `/:name` placeholders included.
    pub path: String,
    pub params: Vec<String>,
    pub controller: String,
    pub operation: String,
    types: Vec<ParamType>,
    filter: MethodFilter,
    handler: RawHandler,
}

impl CompiledRoute {
    /// The path in axum's `{name}` capture syntax.
    pub fn axum_path(&self) -> String {
        self.path
            .split('/')
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) => format!("{{{name}}}"),
                None => seg.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn param_types(&self) -> &[ParamType] {
        &self.types
    }
}

impl PartialEq for CompiledRoute {
    fn eq(&self, other: &Self) -> bool {
        self.verb == other.verb
            && self.path == other.path
            && self.params == other.params
            && self.controller == other.controller
            && self.operation == other.operation
            && self.types == other.types
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("controller", &self.controller)
            .field("operation", &self.operation)
            .finish()
    }
}

impl fmt::Display for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} {} -> {}::{}",
            self.verb, self.path, self.controller, self.operation
        )
    }
}

/// The routes of one controller and the middleware they share.
#[derive(Clone)]
pub struct GroupTable {
    pub prefix: String,
    pub routes: Vec<CompiledRoute>,
    middleware: Vec<Middleware>,
}

impl GroupTable {
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }
}

impl PartialEq for GroupTable {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.routes == other.routes
            && self.middleware.len() == other.middleware.len()
    }
}

impl fmt::Debug for GroupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupTable")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .field("routes", &self.routes)
            .finish()
    }
}

/// The immutable result of compiling a controller set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteTable {
    groups: Vec<GroupTable>,
}

impl RouteTable {
    pub fn groups(&self) -> &[GroupTable] {
        &self.groups
    }

    pub fn routes(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.groups.iter().flat_map(|g| g.routes.iter())
    }

    /// Look up a route by method and full path (`/:name` syntax).
    pub fn find(&self, verb: Verb, path: &str) -> Option<&CompiledRoute> {
        self.routes().find(|r| r.verb == verb && r.path == path)
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the axum router serving every compiled route.
    pub fn router(&self, shared: &Shared) -> Router {
        // Routes that share a path share one method router.
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for group in &self.groups {
            for route in &group.routes {
                let endpoint = Arc::new(Endpoint {
                    types: route.types.clone(),
                    params: route.params.clone(),
                    handler: route.handler.clone(),
                    shared: shared.clone(),
                });
                let mut method_router = on(route.filter, move |req: Request| {
                    serve(endpoint.clone(), req)
                });
                // Applied innermost first so the first declared runs first.
                for mw in group.middleware.iter().rev() {
                    method_router = method_router
                        .route_layer(from_fn_with_state(intercept_state(mw, shared), intercept));
                }

                let path = route.axum_path();
                let merged = match by_path.remove(&path) {
                    Some(existing) => existing.merge(method_router),
                    None => method_router,
                };
                by_path.insert(path, merged);
            }
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }
}

/// Compiles controllers into a [`RouteTable`].
pub struct RouteCompiler;

impl RouteCompiler {
    /// Validate and compile every controller.
    ///
    /// All configuration issues are collected before failing, so a single
    /// startup run reports every malformed operation.
    pub fn compile(controllers: &[Arc<dyn Controller>]) -> Result<RouteTable, StartupError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(controllers.len());

        for controller in controllers {
            let setup = controller.setup();
            let prefix = setup.prefix();
            let name = controller.name().to_string();
            let mut routes = Vec::new();

            for operation in Arc::clone(controller).operations() {
                if operation.name() == SETUP {
                    continue;
                }

                let parsed = match signature::parse(operation.name(), operation.params()) {
                    Ok(Some(parsed)) => parsed,
                    Ok(None) => {
                        tracing::debug!(
                            controller = %name,
                            operation = operation.name(),
                            "no verb prefix, not routed"
                        );
                        continue;
                    }
                    Err(e) => {
                        issues.push(signature_issue(e, &name, operation.name()));
                        continue;
                    }
                };

                let Ok(filter) = MethodFilter::try_from(parsed.verb.method()) else {
                    issues.push(ConfigIssue::UnsupportedVerb {
                        verb: parsed.verb.to_string(),
                    });
                    continue;
                };

                let path = full_path(&prefix, &parsed.path);
                if !seen.insert((parsed.verb, path.clone())) {
                    issues.push(ConfigIssue::DuplicateRoute {
                        method: parsed.verb.to_string(),
                        path,
                    });
                    continue;
                }

                routes.push(CompiledRoute {
                    verb: parsed.verb,
                    path,
                    params: parsed.params,
                    controller: name.clone(),
                    operation: operation.name().to_string(),
                    types: operation.params().to_vec(),
                    filter,
                    handler: operation.handler(),
                });
            }

            groups.push(GroupTable {
                prefix,
                routes,
                middleware: setup.middleware().to_vec(),
            });
        }

        if issues.is_empty() {
            Ok(RouteTable { groups })
        } else {
            Err(StartupError::new(issues))
        }
    }
}

fn signature_issue(err: SignatureError, controller: &str, operation: &str) -> ConfigIssue {
    let controller = controller.to_string();
    let operation = operation.to_string();
    match err {
        SignatureError::MissingContext => ConfigIssue::MissingContext {
            controller,
            operation,
        },
        SignatureError::MisplacedContext(index) => ConfigIssue::MisplacedContext {
            controller,
            operation,
            index,
        },
        SignatureError::BodyNotLast => ConfigIssue::BodyNotLast {
            controller,
            operation,
        },
    }
}

fn full_path(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

// ── Request handling ──

struct Endpoint {
    types: Vec<ParamType>,
    params: Vec<String>,
    handler: RawHandler,
    shared: Shared,
}

/// Bind, invoke, format.
async fn serve(endpoint: Arc<Endpoint>, req: Request) -> Response {
    let (mut parts, body) = req.into_parts();
    let context = endpoint.shared.context(&parts);
    let span = context.log.clone();

    let path = if endpoint.params.is_empty() {
        PathParams::new()
    } else {
        match Path::<PathParams>::from_request_parts(&mut parts, &()).await {
            Ok(Path(params)) => params,
            Err(rejection) => return BintError::BadRequest(rejection.body_text()).into_response(),
        }
    };

    let body = if endpoint.types.contains(&ParamType::Body) {
        match axum::body::to_bytes(body, endpoint.shared.body_limit).await {
            Ok(bytes) => bytes,
            Err(_) => return BintError::BadRequest("invalid request body".to_string()).into_response(),
        }
    } else {
        Bytes::new()
    };

    let incoming = Incoming {
        context,
        path,
        body,
    };
    let args = match binder::bind(&endpoint.types, &endpoint.params, incoming) {
        Ok(args) => args,
        Err(e) => {
            tracing::debug!(parent: &span, error = %e, "parameter binding failed");
            return e.into_response();
        }
    };

    match (endpoint.handler)(args).instrument(span.clone()).await {
        Ok(reply) => {
            if let Reply::Failure { code, message } = &reply {
                tracing::debug!(parent: &span, code, message = %message, "operation failed");
            }
            reply.into_envelope().into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Clone)]
pub(crate) struct Interceptor {
    mw: Middleware,
    shared: Shared,
}

pub(crate) fn intercept_state(mw: &Middleware, shared: &Shared) -> Interceptor {
    Interceptor {
        mw: Arc::clone(mw),
        shared: shared.clone(),
    }
}

/// Run a [`Middleware`] with a fresh context; errors become envelopes.
pub(crate) async fn intercept(
    State(interceptor): State<Interceptor>,
    req: Request,
    next: Next,
) -> Response {
    let context = interceptor.shared.context_for(&req);
    match (interceptor.mw)(context, req, next).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
