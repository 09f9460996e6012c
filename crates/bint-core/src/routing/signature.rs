//! Operation name + parameter list → HTTP method, path template and
//! path-parameter names.

use std::fmt;

use axum::http::Method;

use super::naming::path_for;

/// HTTP verbs recognized as operation-name prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Verb {
    /// Prefix tokens in match order.
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Patch,
        Verb::Head,
    ];

    /// The case-sensitive token an operation name must start with.
    pub fn prefix(self) -> &'static str {
        match self {
            Verb::Get => "Get",
            Verb::Post => "Post",
            Verb::Put => "Put",
            Verb::Delete => "Delete",
            Verb::Patch => "Patch",
            Verb::Head => "Head",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Head => "HEAD",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
            Verb::Patch => Method::PATCH,
            Verb::Head => Method::HEAD,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar kinds a path segment can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    Int,
    Bool,
    /// Declared but not bindable; fails per request with the type name.
    Other(&'static str),
}

/// Descriptor of one declared operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// The per-request [`Context`](crate::Context).
    Context,
    /// Bound from a path segment.
    Scalar(ScalarKind),
    /// A structured value deserialized from the request body.
    Body,
}

/// A recognized operation, before it is attached to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    pub verb: Verb,
    /// Route path relative to the group, `/:name` placeholders included.
    pub path: String,
    /// Placeholder names, in declaration order.
    pub params: Vec<String>,
}

/// A recognized operation with a malformed parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    MissingContext,
    MisplacedContext(usize),
    BodyNotLast,
}

/// Parse one operation.
///
/// Returns `Ok(None)` when the name starts with none of the verb tokens.
/// Parameter 0 must be the context. Scalars that follow are path
/// parameters named `param1`, `param2`, ... after their position; scanning
/// stops at the body parameter, which must be the last one.
pub fn parse(name: &str, params: &[ParamType]) -> Result<Option<ParsedRoute>, SignatureError> {
    let Some(verb) = Verb::ALL.into_iter().find(|v| name.starts_with(v.prefix())) else {
        return Ok(None);
    };

    if params.first() != Some(&ParamType::Context) {
        return Err(SignatureError::MissingContext);
    }

    let mut names = Vec::new();
    for (i, param) in params.iter().enumerate().skip(1) {
        match param {
            ParamType::Context => return Err(SignatureError::MisplacedContext(i)),
            ParamType::Body => {
                if i + 1 != params.len() {
                    return Err(SignatureError::BodyNotLast);
                }
                break;
            }
            ParamType::Scalar(_) => names.push(format!("param{i}")),
        }
    }

    let base = path_for(&name[verb.prefix().len()..]);
    Ok(Some(ParsedRoute {
        verb,
        path: build_route_path(&base, &names),
        params: names,
    }))
}

/// Append a `/:name` placeholder per path parameter.
pub fn build_route_path(base: &str, params: &[String]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    format!("{}/:{}", base, params.join("/:"))
}
