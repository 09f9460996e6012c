use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUCCESS: &str = "success";
pub const FAIL: &str = "fail";
pub const ABNORMAL: &str = "abnormal parameter of response formatting";

/// Uniform response wrapper returned by every compiled route.
///
/// ```json
/// { "code": 0, "msg": "success", "data": { ... } }
/// ```
///
/// `code` is `0` on success; any other value is a failure whose meaning is
/// up to the caller. `data` is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn success() -> Self {
        Envelope {
            code: 0,
            msg: SUCCESS.to_string(),
            data: None,
        }
    }

    pub fn with_data(data: Value) -> Self {
        Envelope {
            code: 0,
            msg: SUCCESS.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Envelope {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn abnormal() -> Self {
        Envelope::failure(-1, ABNORMAL)
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl axum::response::IntoResponse for Envelope {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}

/// The result of an operation, before it is wrapped in an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Empty,
    Payload(Value),
    Failure { code: i64, message: String },
}

impl Reply {
    /// `{0, "success"}`
    pub fn empty() -> Self {
        Reply::Empty
    }

    /// `{0, "success", data}`. A value that fails to serialize becomes a
    /// `-1` failure carrying the serializer's message.
    pub fn data<T: Serialize>(value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Reply::Payload(v),
            Err(e) => Reply::error(e),
        }
    }

    /// `{-1, error text}`
    pub fn error(err: impl fmt::Display) -> Self {
        Reply::Failure {
            code: -1,
            message: err.to_string(),
        }
    }

    /// `{code, "fail"}`
    pub fn code(code: i64) -> Self {
        Reply::Failure {
            code,
            message: FAIL.to_string(),
        }
    }

    /// `{-1, message}`
    pub fn message(message: impl Into<String>) -> Self {
        Reply::Failure {
            code: -1,
            message: message.into(),
        }
    }

    /// `{-1, value rendered as text}` for values of no other kind.
    pub fn display(value: impl fmt::Display) -> Self {
        Reply::error(value)
    }

    /// The two-value form: `{code, message}`.
    pub fn fail(code: i64, message: impl fmt::Display) -> Self {
        Reply::Failure {
            code,
            message: message.to_string(),
        }
    }

    pub fn abnormal() -> Self {
        Reply::message(ABNORMAL)
    }

    pub fn into_envelope(self) -> Envelope {
        match self {
            Reply::Empty => Envelope::success(),
            Reply::Payload(data) => Envelope::with_data(data),
            Reply::Failure { code, message } => Envelope::failure(code, message),
        }
    }
}

impl From<Reply> for Envelope {
    fn from(reply: Reply) -> Self {
        reply.into_envelope()
    }
}

/// Conversion from an operation's return value into a [`Reply`].
///
/// Implemented for the shapes an operation usually returns: nothing,
/// a code, a message, a `(code, message)` pair, serializable collections,
/// [`Json`] for anything else that serializes, and `Result`/`Option`
/// wrappers around those.
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Empty
    }
}

impl IntoReply for i64 {
    fn into_reply(self) -> Reply {
        Reply::code(self)
    }
}

impl IntoReply for i32 {
    fn into_reply(self) -> Reply {
        Reply::code(i64::from(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::message(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::message(self)
    }
}

macro_rules! impl_code_message {
    ($($code:ty => $msg:ty),* $(,)?) => {
        $(
            impl IntoReply for ($code, $msg) {
                fn into_reply(self) -> Reply {
                    Reply::fail(i64::from(self.0), self.1)
                }
            }
        )*
    };
}

impl_code_message!(
    i64 => String,
    i64 => &'static str,
    i32 => String,
    i32 => &'static str,
);

impl<T: Serialize> IntoReply for Vec<T> {
    fn into_reply(self) -> Reply {
        Reply::data(self)
    }
}

impl<K, V, S> IntoReply for HashMap<K, V, S>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
    S: BuildHasher,
{
    fn into_reply(self) -> Reply {
        Reply::data(self)
    }
}

impl<K: Serialize + Ord, V: Serialize> IntoReply for BTreeMap<K, V> {
    fn into_reply(self) -> Reply {
        Reply::data(self)
    }
}

/// `None` is a success without data.
impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        match self {
            Some(inner) => inner.into_reply(),
            None => Reply::Empty,
        }
    }
}

impl<T: IntoReply, E: fmt::Display> IntoReply for Result<T, E> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(inner) => inner.into_reply(),
            Err(e) => Reply::error(e),
        }
    }
}

/// Dispatches on the runtime kind of the JSON value.
impl IntoReply for Value {
    fn into_reply(self) -> Reply {
        match self {
            Value::Object(_) | Value::Array(_) => Reply::Payload(self),
            Value::Null => Reply::Empty,
            Value::String(s) => Reply::message(s),
            Value::Number(n) => match n.as_i64() {
                Some(code) => Reply::code(code),
                None => Reply::display(n),
            },
            Value::Bool(b) => Reply::display(b),
        }
    }
}

/// Marks a serializable value as the success payload.
///
/// ```rust,ignore
/// async fn get(ctx: Context, id: i64) -> Result<Json<User>, BintError> {
///     Ok(Json(find_user(&ctx, id).await?))
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Reply {
        Reply::data(self.0)
    }
}

// ── Loosely-typed formatting ──

/// Dynamic kind of a single result value, for callers that assemble
/// results at runtime (scripted handlers, generic adapters).
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// A record, map or sequence.
    Composite(Value),
    /// An error-bearing value, carrying its message.
    Error(String),
    /// A nullable reference; `None` is nil.
    Optional(Option<Value>),
    Int(i64),
    Str(String),
    /// Anything else, already rendered as text.
    Other(String),
}

impl ResultValue {
    fn render(&self) -> String {
        match self {
            ResultValue::Composite(v) | ResultValue::Optional(Some(v)) => v.to_string(),
            ResultValue::Optional(None) => "<nil>".to_string(),
            ResultValue::Int(n) => n.to_string(),
            ResultValue::Error(s) | ResultValue::Str(s) | ResultValue::Other(s) => s.clone(),
        }
    }
}

/// Format a result tuple into an envelope by arity and kind.
///
/// With two values the first must be an integer code; any other shape,
/// including a non-integer first value, yields the abnormal envelope.
pub fn format(values: &[ResultValue]) -> Envelope {
    match values {
        [] => Envelope::success(),
        [single] => match single {
            ResultValue::Composite(v) => Envelope::with_data(v.clone()),
            ResultValue::Error(msg) => Envelope::failure(-1, msg.clone()),
            ResultValue::Optional(Some(v)) => Envelope::with_data(v.clone()),
            ResultValue::Optional(None) => Envelope::success(),
            ResultValue::Int(code) => Envelope::failure(*code, FAIL),
            ResultValue::Str(msg) => Envelope::failure(-1, msg.clone()),
            ResultValue::Other(text) => Envelope::failure(-1, text.clone()),
        },
        [ResultValue::Int(code), second] => Envelope::failure(*code, second.render()),
        _ => Envelope::abnormal(),
    }
}
