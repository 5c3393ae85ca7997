//! Errors surfaced by the HTTP handlers.
//!
//! Every variant aborts the current request. Only a bad webhook signature is
//! the caller's fault; everything else maps to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The voice adapter body was not `{"text": "..."}`
    #[error("Error on decode JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// Missing or mismatching `X-Line-Signature`
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed webhook body that is not a valid event batch
    #[error("Error on parse request: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Error on push message: {0:#}")]
    Push(#[source] anyhow::Error),

    #[error("Error on reply message: {0:#}")]
    Reply(#[source] anyhow::Error),

    #[error("Error on persist message: {0:#}")]
    Persist(#[source] anyhow::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidSignature => StatusCode::BAD_REQUEST,
            RelayError::Decode(_)
            | RelayError::Parse(_)
            | RelayError::Push(_)
            | RelayError::Reply(_)
            | RelayError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Handler error: status code: {}, {}", status.as_u16(), self);
        status.into_response()
    }
}
