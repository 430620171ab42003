use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use chatflow_shared::token::TokenError;
use chatflow_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed input: missing fields, short password, empty content.
    #[error("{0}")]
    Validation(String),

    /// Registration collides with an existing username or email. The
    /// message names the conflicting field.
    #[error("{0}")]
    Conflict(String),

    /// Login with an unknown email or a wrong password. One generic
    /// message for both so the response does not reveal which field
    /// was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed, expired, or signature-invalid bearer token.
    #[error("Authentication error")]
    Authentication,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Credential token error: {0}")]
    Token(#[from] TokenError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Authentication => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Persistence(_) | ServerError::Token(_) | ServerError::Internal(_) => {
                // The cause is logged server-side and never leaked.
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response =
            ServerError::Validation("Email and password are required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_credentials_map_to_unauthorized() {
        let response = ServerError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_failures_hide_details() {
        let error = ServerError::Persistence(StoreError::Migration("boom".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
