//! Idempotency keys for mutating commands

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// A validated client-chosen retry token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Result<Self, LedgerError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("Idempotency key must not be empty"));
        }
        if trimmed.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(LedgerError::validation(format!(
                "Idempotency key exceeds {} characters",
                MAX_IDEMPOTENCY_KEY_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bounds() {
        assert!(IdempotencyKey::new("").is_err());
        assert!(IdempotencyKey::new("   ").is_err());
        assert!(IdempotencyKey::new("k".repeat(129)).is_err());
        assert_eq!(IdempotencyKey::new(" order-1 ").unwrap().as_str(), "order-1");
    }
}
