//! Convention-based route compilation.
//!
//! Controllers are compiled once at startup:
//!
//! - [`naming`] turns the part of an operation name after its verb into a
//!   path segment (`UserOrder` → `/user-order`)
//! - [`signature`] recognizes the verb and assigns path placeholders to the
//!   scalar parameters
//! - [`binder`] turns path segments and the body into arguments per request
//! - [`compiler`] validates every controller and produces the immutable
//!   [`RouteTable`], which becomes an axum [`Router`](axum::Router)

pub mod binder;
pub mod compiler;
pub mod naming;
pub mod signature;

pub use binder::{bind, parse_param, Arg, Incoming, PathParams};
pub use compiler::{CompiledRoute, GroupTable, RouteCompiler, RouteTable};
pub use naming::path_for;
pub use signature::{build_route_path, parse, ParamType, ParsedRoute, ScalarKind, SignatureError, Verb};
