//! Error types and HTTP response handling.
//!
//! This module provides the application's error hierarchy and the conversion that
//! turns any error raised inside a handler into the error envelope. `AppError` is
//! the top-level error type wrapping the layer-specific errors; `Fault` is what
//! handlers actually return, an `AppError` plus the backtrace captured where it
//! was raised.

pub mod config;
pub mod param;
pub mod store;

use axum::response::{IntoResponse, Response};
use std::backtrace::Backtrace;
use thiserror::Error;

use crate::{
    model::api::Envelope,
    server::error::{config::ConfigError, param::ParamError, store::StoreError},
};

/// Top-level application error type.
///
/// Aggregates all possible error types that can occur in the application. Most
/// variants use `#[from]` for automatic conversion. Unlike a status-mapped API,
/// every variant ends up as the same error envelope at transport status 500; the
/// variants only differ by the message they carry.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup or environment variable loading.
    #[error(transparent)]
    ConfigErr(#[from] ConfigError),

    /// Required request parameter missing or failed coercion.
    #[error(transparent)]
    ParamErr(#[from] ParamError),

    /// Document store operation failure.
    #[error(transparent)]
    StoreErr(#[from] StoreError),

    /// Database error outside of a store primitive (connecting, migrating).
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),

    /// Socket or listener error while serving.
    #[error(transparent)]
    IoErr(#[from] std::io::Error),

    /// Resource not found error.
    ///
    /// # Fields
    /// - Message describing what resource was not found
    #[error("{0}")]
    NotFound(String),

    /// Invalid request error.
    ///
    /// # Fields
    /// - Message describing what was invalid about the request
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error with custom message.
    ///
    /// # Fields
    /// - Detailed error message
    #[error("{0}")]
    InternalError(String),
}

/// Error returned by request handlers.
///
/// Any error convertible into `AppError` converts into a `Fault` through `?`,
/// capturing a backtrace at that point so the response path can log where the
/// failure originated.
#[derive(Debug)]
pub struct Fault {
    error: AppError,
    backtrace: Backtrace,
}

impl<E> From<E> for Fault
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self {
            error: err.into(),
            backtrace: Backtrace::force_capture(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

/// Converts a fault into the error envelope.
///
/// Logs the fault and its backtrace at error level, then responds with the
/// envelope `{error: true, code: 501, msg: <fault>, data: null}` at status 500.
/// There is no per-variant status mapping.
impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.error, "{}", self.error);
        tracing::error!("{}", self.backtrace);

        Envelope::error(self.error.to_string()).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        Fault::from(self).into_response()
    }
}
