//! Request-level errors and their HTTP rendering

use hyper::{Response, StatusCode};
use thiserror::Error;

use crate::http::{self, ResponseBody};
use crate::logger;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request: bad JSON, missing or mistyped fields, missing query parameters
    #[error("{0}")]
    BadRequest(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("{0}")]
    NotFound(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed { allow: &'static str },

    /// Anything raised while running the coder or reading a file
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text returned to the client.
    ///
    /// Internal errors expose the message followed by the full report: the
    /// cause chain, plus a backtrace only when `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE` was set at startup.
    pub fn detail(&self) -> String {
        match self {
            Self::Internal(err) => format!("{err}\n{err:?}"),
            other => other.to_string(),
        }
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        let detail = self.detail();
        match &self {
            Self::Internal(err) => logger::log_error(&format!("{err:#}")),
            other => tracing::debug!("Request rejected: {other}"),
        }
        let allow = match &self {
            Self::MethodNotAllowed { allow } => Some(*allow),
            _ => None,
        };
        http::build_error_response(self.status(), &detail, allow)
    }
}
