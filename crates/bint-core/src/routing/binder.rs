//! Per-request argument binding.

use std::collections::HashMap;

use bytes::Bytes;

use super::signature::{ParamType, ScalarKind};
use crate::context::Context;
use crate::error::BintError;

/// Captured path segments, keyed by placeholder name.
pub type PathParams = HashMap<String, String>;

/// A bound argument, in declaration order.
#[derive(Clone)]
pub enum Arg {
    Context(Context),
    Str(String),
    Int(i64),
    Bool(bool),
    /// Raw request payload; the operation's body type decodes it.
    Body(Bytes),
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Context(_) => f.write_str("Context"),
            Arg::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Arg::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Arg::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Arg::Body(b) => f.debug_tuple("Body").field(&b.len()).finish(),
        }
    }
}

/// Everything the binder reads from one request.
pub struct Incoming {
    pub context: Context,
    pub path: PathParams,
    pub body: Bytes,
}

/// Produce the argument list for an operation.
///
/// `params` is the declared parameter list and `names` the placeholder
/// names assigned at compile time, one per scalar. The first failure
/// short-circuits.
pub fn bind(params: &[ParamType], names: &[String], incoming: Incoming) -> Result<Vec<Arg>, BintError> {
    let Incoming {
        context,
        path,
        mut body,
    } = incoming;

    let mut args = Vec::with_capacity(params.len());
    let mut names = names.iter();

    for param in params {
        let arg = match param {
            ParamType::Context => Arg::Context(context.clone()),
            ParamType::Body => Arg::Body(std::mem::take(&mut body)),
            ParamType::Scalar(kind) => {
                let name = names.next().ok_or_else(|| {
                    BintError::Internal("path parameter count mismatch".to_string())
                })?;
                parse_param(name, path.get(name).map(String::as_str), *kind)?
            }
        };
        args.push(arg);
    }
    Ok(args)
}

/// Convert one path segment into its declared scalar kind.
pub fn parse_param(name: &str, value: Option<&str>, kind: ScalarKind) -> Result<Arg, BintError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            return Err(BintError::BadRequest(format!(
                "missing required parameter: {name}"
            )));
        }
    };

    match kind {
        ScalarKind::Str => Ok(Arg::Str(value.to_string())),
        ScalarKind::Int => value
            .parse::<i64>()
            .map(Arg::Int)
            .map_err(|_| BintError::BadRequest(format!("invalid integer value {name}"))),
        ScalarKind::Bool => parse_bool(value)
            .map(Arg::Bool)
            .ok_or_else(|| BintError::BadRequest(format!("invalid boolean value {name}"))),
        ScalarKind::Other(type_name) => Err(BintError::UnsupportedParameter(type_name.to_string())),
    }
}

/// Boolean spellings accepted in a path segment.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("param{i}")).collect()
    }

    fn path(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn incoming(path: PathParams, body: &'static [u8]) -> Incoming {
        Incoming {
            context: Context::detached(),
            path,
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_parse_integer() {
        match parse_param("param1", Some("42"), ScalarKind::Int).unwrap() {
            Arg::Int(n) => assert_eq!(n, 42),
            other => panic!("unexpected {other:?}"),
        }
        match parse_param("param1", Some("-7"), ScalarKind::Int).unwrap() {
            Arg::Int(n) => assert_eq!(n, -7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_integer_names_the_parameter() {
        let err = parse_param("param1", Some("abc"), ScalarKind::Int).unwrap_err();
        assert!(matches!(err, BintError::BadRequest(_)));
        assert_eq!(err.to_string(), "invalid integer value param1");
    }

    #[test]
    fn test_missing_parameter() {
        let err = parse_param("param2", None, ScalarKind::Str).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: param2");

        let err = parse_param("param2", Some(""), ScalarKind::Int).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: param2");
    }

    #[test]
    fn test_boolean_spellings() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRUE"), None);

        let err = parse_param("param1", Some("maybe"), ScalarKind::Bool).unwrap_err();
        assert_eq!(err.to_string(), "invalid boolean value param1");
    }

    #[test]
    fn test_unsupported_kind_is_internal() {
        let err = parse_param("param1", Some("1.5"), ScalarKind::Other("f64")).unwrap_err();
        assert!(matches!(err, BintError::UnsupportedParameter(_)));
        assert!(err.status_code().is_server_error());
        assert_eq!(err.to_string(), "unsupported parameter type: f64");
    }

    #[test]
    fn test_bind_in_declaration_order() {
        let params = [
            ParamType::Context,
            ParamType::Scalar(ScalarKind::Str),
            ParamType::Scalar(ScalarKind::Int),
            ParamType::Body,
        ];
        let args = bind(
            &params,
            &names(2),
            incoming(path(&[("param1", "alice"), ("param2", "5")]), b"{}"),
        )
        .unwrap();

        assert_eq!(args.len(), 4);
        assert!(matches!(args[0], Arg::Context(_)));
        assert!(matches!(&args[1], Arg::Str(s) if s == "alice"));
        assert!(matches!(args[2], Arg::Int(5)));
        assert!(matches!(&args[3], Arg::Body(b) if b.as_ref() == b"{}"));
    }

    #[test]
    fn test_bind_short_circuits_on_first_error() {
        let params = [
            ParamType::Context,
            ParamType::Scalar(ScalarKind::Int),
            ParamType::Scalar(ScalarKind::Bool),
        ];
        let err = bind(
            &params,
            &names(2),
            incoming(path(&[("param1", "x"), ("param2", "nope")]), b""),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid integer value param1");
    }
}
