//! Request handlers

pub mod health;
pub mod property;
pub mod investment;
pub mod wallet;
pub mod kyc;
pub mod market;
pub mod dividend;

use axum::http::HeaderMap;
use validator::Validate;

use domain_ledger::IdempotencyKey;

use crate::error::ApiError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Resolves the idempotency key of a mutating request
///
/// The `Idempotency-Key` header wins over the body field.
pub fn idempotency_key(headers: &HeaderMap, body: Option<String>) -> Result<IdempotencyKey, ApiError> {
    let header = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::bad_request("Idempotency-Key header is not valid ASCII"))
        })
        .transpose()?;

    match header.or(body) {
        Some(key) => Ok(IdempotencyKey::new(key)?),
        None => Err(ApiError::bad_request(
            "Idempotency-Key header or idempotency_key field is required",
        )),
    }
}

/// Runs `validator` rules on a request body
pub fn validated<T: Validate>(request: T) -> Result<T, ApiError> {
    request.validate()?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_wins_over_body() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("from-header"));
        let key = idempotency_key(&headers, Some("from-body".to_string())).unwrap();
        assert_eq!(key.as_str(), "from-header");
    }

    #[test]
    fn test_body_key_used_without_header() {
        let key = idempotency_key(&HeaderMap::new(), Some("from-body".to_string())).unwrap();
        assert_eq!(key.as_str(), "from-body");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(matches!(
            idempotency_key(&HeaderMap::new(), None),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_blank_key_is_rejected() {
        assert!(matches!(
            idempotency_key(&HeaderMap::new(), Some("   ".to_string())),
            Err(ApiError::Ledger(_))
        ));
    }
}
