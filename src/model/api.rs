//! The response envelope every endpoint answers with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Application code of a successful response.
pub const SUCCESS_CODE: i64 = 200;

/// Default application code of an error response. The transport status of an
/// error is always 500 whatever this code says.
pub const ERROR_CODE: i64 = 501;

/// `{error, code, msg, data, ...extra}`
///
/// `code` is an application code and is independent of the HTTP status the
/// envelope is sent with: successes go out as 200, errors as 500.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub error: bool,
    pub code: i64,
    pub msg: Option<String>,
    #[schema(value_type = Object)]
    pub data: Value,
    /// Additional top-level keys, flattened next to the fixed ones.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Success envelope with code 200 and no message.
    pub fn success(data: Value) -> Self {
        Self {
            error: false,
            code: SUCCESS_CODE,
            msg: None,
            data,
            extra: Map::new(),
        }
    }

    /// Error envelope with code 501 and null data.
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: true,
            code: ERROR_CODE,
            msg: Some(msg.into()),
            data: Value::Null,
            extra: Map::new(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Adds an extra top-level key. Keys that collide with the fixed fields
    /// are ignored.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !matches!(key.as_str(), "error" | "code" | "msg" | "data") {
            self.extra.insert(key, value);
        }
        self
    }
}
