use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use serde_json::json;
use thiserror::Error;

/// Lines of the source chain included in a 500 response.
pub const TRACE_LINES: usize = 5;

#[derive(Error, Debug)]
pub enum HerdbookError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HerdbookError {
    /// The error's own message followed by its sources, at most `limit` lines.
    pub fn trace(&self, limit: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current: Option<&dyn std::error::Error> = Some(self);
        while let Some(err) = current {
            if lines.len() >= limit {
                break;
            }
            lines.push(err.to_string());
            current = err.source();
        }
        lines
    }
}

// Serialized as its display string so reports can carry failures verbatim.
impl Serialize for HerdbookError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type HerdbookResult<T> = Result<T, HerdbookError>;

impl IntoResponse for HerdbookError {
    fn into_response(self) -> Response {
        let status = match self {
            HerdbookError::Unauthorized => {
                let body = Json(json!({ "success": false, "error": "Unauthorized" }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            HerdbookError::Validation(_) => StatusCode::BAD_REQUEST,
            HerdbookError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!("Request failed: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            Json(json!({
                "success": false,
                "error": self.to_string(),
                "trace": self.trace(TRACE_LINES),
            }))
        } else {
            Json(json!({
                "success": false,
                "error": self.to_string(),
            }))
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_is_bounded() {
        let err = HerdbookError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk unplugged",
        ));
        let trace = err.trace(TRACE_LINES);
        assert_eq!(trace[0], "IO error: disk unplugged");
        assert!(trace.len() <= TRACE_LINES);
        assert_eq!(err.trace(1).len(), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            HerdbookError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HerdbookError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HerdbookError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
