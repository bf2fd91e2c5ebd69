pub mod cards;
pub mod library;
pub mod previews;

pub use cards::*;
pub use library::*;
pub use previews::*;

use crate::error::ForgeError;
use crate::library::LibraryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl ForgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForgeError::Validation(_) => StatusCode::BAD_REQUEST,
            ForgeError::Configuration(_) => StatusCode::UNAUTHORIZED,
            ForgeError::AllCredentialsExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            ForgeError::Fatal(_) | ForgeError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
            ForgeError::Library(LibraryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ForgeError::Library(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
