//! JSON error responses.
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Failure of a relay request. Every variant renders as `{"error": message}`
/// plus any variant-specific fields.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Conflict { message: String, suins_name: String },

    #[error("{0}")]
    Unprocessable(String),

    /// Upstream service failure; `details` carries its response body when
    /// one was returned.
    #[error("{message}")]
    Upstream { message: String, details: Option<Value> },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            details: None,
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({ "error": self.to_string() });
        match self {
            Self::Conflict { suins_name, .. } => body["suinsName"] = json!(suins_name),
            Self::Upstream {
                details: Some(details),
                ..
            } => body["details"] = details.clone(),
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_carries_the_linked_name() {
        let error = ApiError::Conflict {
            message: "This creator already has a SuiNS name".to_string(),
            suins_name: "ada.patreon.sui".to_string(),
        };
        assert_eq!(error.status(), StatusCode::CONFLICT);
        assert_eq!(
            error.body(),
            json!({ "error": "This creator already has a SuiNS name", "suinsName": "ada.patreon.sui" })
        );
    }

    #[test]
    fn upstream_without_details_is_bare() {
        let error = ApiError::upstream("connection reset");
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error.body(), json!({ "error": "connection reset" }));
    }
}
