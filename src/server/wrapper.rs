//! Conversion of handler output into the response envelope.
//!
//! Handlers return `Result<Reply, Fault>`. `Ok` values become the success
//! envelope at status 200, unless they are a pre-built response which passes
//! through untouched. `Err` faults become the error envelope at status 500
//! through [`Fault`]'s `IntoResponse` impl.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    model::api::Envelope,
    server::error::{AppError, Fault},
};

pub type HandlerResult = Result<Reply, Fault>;

/// Successful handler output.
pub enum Reply {
    /// Data wrapped into the success envelope
    Data(Value),
    /// A fully built envelope, e.g. one carrying extra keys or a message
    Envelope(Envelope),
    /// A response sent as is
    Raw(Response),
}

impl Reply {
    /// Serializes `data` into the success envelope's `data` field.
    pub fn data<T: Serialize>(data: &T) -> Result<Self, Fault> {
        let value = serde_json::to_value(data)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize reply: {}", e)))?;
        Ok(Self::Data(value))
    }

    pub fn raw(response: impl IntoResponse) -> Self {
        Self::Raw(response.into_response())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Data(data) => Envelope::success(data).into_response(),
            Self::Envelope(envelope) => envelope.into_response(),
            Self::Raw(response) => response,
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = if self.error {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        (status, Json(self)).into_response()
    }
}
