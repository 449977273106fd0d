use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medichat_models::ErrorEnvelope;
use thiserror::Error;

/// Classification of a failed relay request, independent of its wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    AuthorizationUnavailable,
    InvalidInput,
    RateLimited,
    PaymentRequired,
    ProviderError,
}

/// Every way a relay request can fail. The `Display` text is what the caller
/// sees; provider details are only ever logged.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Authentication required")]
    MissingCredential,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("You do not have permission to use the medical assistant")]
    Forbidden,

    #[error("Unable to verify permissions, please try again later")]
    AuthorizationUnavailable,

    #[error("{field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Rate limit exceeded, please try again later.")]
    RateLimited,

    #[error("Please add credits to continue.")]
    PaymentRequired,

    #[error("The AI service encountered an error")]
    Provider,
}

impl RelayError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential | Self::InvalidSession => ErrorKind::Unauthenticated,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::AuthorizationUnavailable => ErrorKind::AuthorizationUnavailable,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::PaymentRequired => ErrorKind::PaymentRequired,
            Self::Provider => ErrorKind::ProviderError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::AuthorizationUnavailable | ErrorKind::ProviderError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorEnvelope::new(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_table() {
        let cases = [
            (RelayError::MissingCredential, 401),
            (RelayError::InvalidSession, 401),
            (RelayError::Forbidden, 403),
            (RelayError::AuthorizationUnavailable, 500),
            (RelayError::invalid("question", "too long"), 400),
            (RelayError::RateLimited, 429),
            (RelayError::PaymentRequired, 402),
            (RelayError::Provider, 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn test_unauthenticated_messages_stay_distinct() {
        assert_eq!(RelayError::MissingCredential.kind(), ErrorKind::Unauthenticated);
        assert_eq!(RelayError::InvalidSession.kind(), ErrorKind::Unauthenticated);
        assert_ne!(
            RelayError::MissingCredential.to_string(),
            RelayError::InvalidSession.to_string()
        );
    }

    #[test]
    fn test_invalid_input_names_field() {
        let err = RelayError::invalid("patientInfo.name", "must be at most 100 characters");
        assert_eq!(err.to_string(), "patientInfo.name: must be at most 100 characters");
    }

    #[tokio::test]
    async fn test_response_uses_error_envelope() {
        let response = RelayError::PaymentRequired.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Please add credits to continue."}));
    }
}
