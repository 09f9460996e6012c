//! The controller registration interface.
//!
//! A controller is a bundle of operations sharing a URL prefix and a list of
//! group middleware. Operations are declared by name; the name decides the
//! HTTP method and path, the argument types decide which values come from
//! the path and which one from the request body.
//!
//! ```rust,ignore
//! use bint_core::prelude::*;
//!
//! struct UserController;
//!
//! impl Controller for UserController {
//!     fn setup(&self) -> RouteGroup {
//!         RouteGroup::new("user")
//!     }
//!
//!     fn operations(self: Arc<Self>) -> Vec<Operation> {
//!         vec![
//!             // GET /user/:param1
//!             Operation::new("Get", |ctx: Context, id: i64| async move {
//!                 find_user(&ctx, id).await.map(Json)
//!             }),
//!             // POST /user
//!             Operation::new("Post", |ctx: Context, Body(user): Body<NewUser>| async move {
//!                 create_user(&ctx, user).await
//!             }),
//!         ]
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::BintError;
use crate::response::{IntoReply, Reply};
use crate::routing::{Arg, ParamType, ScalarKind};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Type-erased operation body: bound arguments in, reply out.
pub type RawHandler = Arc<dyn Fn(Vec<Arg>) -> BoxFuture<Result<Reply, BintError>> + Send + Sync>;

/// Group or application level request interceptor.
///
/// Receives a fresh [`Context`] plus the request, and either forwards it
/// with `next.run(req)` or answers directly. An `Err` is turned into the
/// `{code: -1}` envelope.
pub type Middleware =
    Arc<dyn Fn(Context, Request, Next) -> BoxFuture<Result<Response, BintError>> + Send + Sync>;

/// Wrap an async function as a [`Middleware`].
///
/// ```rust,ignore
/// let auth = middleware(|ctx: Context, req: Request, next: Next| async move {
///     if ctx.header("authorization").is_none() {
///         return Err(BintError::handler("unauthorized"));
///     }
///     Ok(next.run(req).await)
/// });
/// ```
pub fn middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BintError>> + Send + 'static,
{
    Arc::new(
        move |ctx: Context, req: Request, next: Next| -> BoxFuture<Result<Response, BintError>> {
            Box::pin(f(ctx, req, next))
        },
    )
}

/// Group prefix and group-scoped middleware, returned by
/// [`Controller::setup`].
#[derive(Clone, Default)]
pub struct RouteGroup {
    prefix: String,
    middleware: Vec<Middleware>,
}

impl RouteGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        RouteGroup {
            prefix: prefix.into(),
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. The first one added runs first.
    pub fn layer(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    /// The prefix with a leading `/` and no trailing `/`; empty for the root.
    pub fn prefix(&self) -> String {
        let trimmed = self.prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }
}

/// The name of the operation that never becomes a route.
pub const SETUP: &str = "Setup";

/// A handler object whose operations are compiled into routes.
pub trait Controller: Send + Sync + 'static {
    /// Group prefix and middleware.
    fn setup(&self) -> RouteGroup;

    /// The exported operations, in registration order.
    fn operations(self: Arc<Self>) -> Vec<Operation>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// One exported operation of a controller.
#[derive(Clone)]
pub struct Operation {
    name: String,
    params: Vec<ParamType>,
    handler: RawHandler,
}

impl Operation {
    /// Declare an operation from a typed async function. The parameter list
    /// is read off the argument types.
    pub fn new<H, T>(name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        Operation {
            name: name.into(),
            params: H::params(),
            handler: Arc::new(move |args: Vec<Arg>| handler.call(args)),
        }
    }

    /// Declare an operation from an explicit parameter list. The closure
    /// receives the bound arguments in declaration order.
    ///
    /// A [`ParamType::Body`] argument arrives as the raw [`Arg::Body`] bytes.
    /// Decoding them is up to the closure: a malformed payload is not turned
    /// into `400 invalid request body` before the call, as it is for
    /// [`Body<T>`] parameters of [`Operation::new`].
    pub fn from_parts<F, Fut>(name: impl Into<String>, params: Vec<ParamType>, f: F) -> Self
    where
        F: Fn(Vec<Arg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        let f = Arc::new(f);
        Operation {
            name: name.into(),
            params,
            handler: Arc::new(move |args: Vec<Arg>| -> BoxFuture<Result<Reply, BintError>> {
                let f = f.clone();
                Box::pin(async move { Ok(f(args).await) })
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub(crate) fn handler(&self) -> RawHandler {
        self.handler.clone()
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A value an operation can take as an argument.
pub trait Param: Sized + Send + 'static {
    const TYPE: ParamType;

    fn from_arg(arg: Arg) -> Result<Self, BintError>;
}

fn mismatch(arg: &Arg) -> BintError {
    BintError::Internal(format!("argument mismatch: {arg:?}"))
}

impl Param for Context {
    const TYPE: ParamType = ParamType::Context;

    fn from_arg(arg: Arg) -> Result<Self, BintError> {
        match arg {
            Arg::Context(ctx) => Ok(ctx),
            other => Err(mismatch(&other)),
        }
    }
}

impl Param for String {
    const TYPE: ParamType = ParamType::Scalar(ScalarKind::Str);

    fn from_arg(arg: Arg) -> Result<Self, BintError> {
        match arg {
            Arg::Str(s) => Ok(s),
            other => Err(mismatch(&other)),
        }
    }
}

impl Param for i64 {
    const TYPE: ParamType = ParamType::Scalar(ScalarKind::Int);

    fn from_arg(arg: Arg) -> Result<Self, BintError> {
        match arg {
            Arg::Int(n) => Ok(n),
            other => Err(mismatch(&other)),
        }
    }
}

impl Param for bool {
    const TYPE: ParamType = ParamType::Scalar(ScalarKind::Bool);

    fn from_arg(arg: Arg) -> Result<Self, BintError> {
        match arg {
            Arg::Bool(b) => Ok(b),
            other => Err(mismatch(&other)),
        }
    }
}

/// A structured argument decoded from the JSON request body.
#[derive(Debug, Clone, Default)]
pub struct Body<T>(pub T);

impl<T: DeserializeOwned + Send + 'static> Param for Body<T> {
    const TYPE: ParamType = ParamType::Body;

    fn from_arg(arg: Arg) -> Result<Self, BintError> {
        match arg {
            Arg::Body(bytes) => serde_json::from_slice(&bytes)
                .map(Body)
                .map_err(|_| BintError::BadRequest("invalid request body".to_string())),
            other => Err(mismatch(&other)),
        }
    }
}

/// Async functions usable as operations.
///
/// Implemented for `Fn(P1, ..., Pn) -> impl Future<Output = impl IntoReply>`
/// with up to six [`Param`] arguments.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    fn params() -> Vec<ParamType>;

    fn call(&self, args: Vec<Arg>) -> BoxFuture<Result<Reply, BintError>>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoReply,
            $($ty: Param,)*
        {
            fn params() -> Vec<ParamType> {
                vec![$($ty::TYPE),*]
            }

            fn call(&self, args: Vec<Arg>) -> BoxFuture<Result<Reply, BintError>> {
                let f = self.clone();
                Box::pin(async move {
                    let mut args = args.into_iter();
                    $(
                        let $ty = match args.next() {
                            Some(arg) => $ty::from_arg(arg)?,
                            None => {
                                return Err(BintError::Internal(
                                    "argument count mismatch".to_string(),
                                ))
                            }
                        };
                    )*
                    Ok(f($($ty),*).await.into_reply())
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(P1);
impl_handler!(P1, P2);
impl_handler!(P1, P2, P3);
impl_handler!(P1, P2, P3, P4);
impl_handler!(P1, P2, P3, P4, P5);
impl_handler!(P1, P2, P3, P4, P5, P6);
