//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_ledger::{ErrorKind, LedgerError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Ledger(err) => {
                let kind = err.kind();
                (status_for(kind), kind.code())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorKind::Validation.code()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorKind::Forbidden.code()),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation.code()),
        }
    }
}

/// HTTP status for each ledger error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::KycRequired | ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::PropertyNotActive
        | ErrorKind::InsufficientShares
        | ErrorKind::ConcurrentConflict
        | ErrorKind::IdempotencyKeyReused
        | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::AmountMismatch | ErrorKind::InsufficientWalletBalance => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match &self {
            ApiError::Ledger(err) if err.kind() == ErrorKind::Infrastructure => {
                error!(error = %err, "Ledger infrastructure failure");
                ("Internal server error".to_string(), None)
            }
            ApiError::Validation(errors) => {
                let details = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| match &e.message {
                            Some(message) => format!("{}: {}", field, message),
                            None => format!("{}: {}", field, e.code),
                        })
                    })
                    .collect::<Vec<_>>();
                ("Request validation failed".to_string(), Some(details))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("error")
                .to_lowercase()
                .replace(' ', "_"),
            code: code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, Money, PortError};
    use rust_decimal_macros::dec;

    #[test]
    fn test_business_rules_map_to_conflict_or_unprocessable() {
        let shares = ApiError::from(LedgerError::InsufficientShares { requested: 10, available: 5 });
        assert_eq!(shares.status_and_code(), (StatusCode::CONFLICT, "INSUFFICIENT_SHARES"));

        let mismatch = ApiError::from(LedgerError::AmountMismatch {
            expected: Money::new(dec!(510), Currency::USD),
            provided: Money::new(dec!(500), Currency::USD),
        });
        assert_eq!(
            mismatch.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "AMOUNT_MISMATCH")
        );
    }

    #[test]
    fn test_kyc_required_is_forbidden() {
        let err = ApiError::from(LedgerError::KycRequired("pending".to_string()));
        assert_eq!(err.status_and_code(), (StatusCode::FORBIDDEN, "KYC_REQUIRED"));
    }

    #[test]
    fn test_port_errors_are_internal() {
        let err = ApiError::from(LedgerError::Port(PortError::connection("connection refused")));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "INFRASTRUCTURE")
        );
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from(LedgerError::not_found("Property", "PROP-1"));
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }
}
