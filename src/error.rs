use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The cookie token was malformed, forged, or signed with another key
    #[error("Invalid session token")]
    InvalidToken,

    /// The store holds no record for the requested session ID
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session store failed or is unavailable
    #[error("Session storage error: {0}")]
    Storage(String),

    /// A caller tried to write a key reserved for session bookkeeping
    #[error("Reserved session key: {0}")]
    ReservedKey(String),

    #[error("Session serialization error: {0}")]
    Serialization(String),

    /// The session layer was not installed in front of this handler
    #[error("Session layer not initialized for this request")]
    NotInitialized,

    #[error("Session configuration error: {0}")]
    Configuration(String),

    /// The request this session belongs to has already been flushed
    #[error("Session already finished; write would be lost")]
    Finished,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl SessionError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::ReservedKey(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken | Self::NotFound(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_)
            | Self::NotInitialized
            | Self::Configuration(_)
            | Self::Finished => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a message that is safe to show to clients.
    ///
    /// Server-side failures are reduced to a generic message; the full error
    /// is only written to the server log.
    fn safe_message(&self) -> String {
        match self {
            Self::ReservedKey(key) => format!("Reserved session key: {}", key),
            Self::InvalidToken | Self::NotFound(_) => "Invalid session".to_string(),
            Self::Storage(_) => "Session storage unavailable".to_string(),
            Self::Serialization(_)
            | Self::NotInitialized
            | Self::Configuration(_)
            | Self::Finished => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        tracing::error!(
            status = status.as_u16(),
            error = %self,
            "Session request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
        });
        (status, body).into_response()
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}
