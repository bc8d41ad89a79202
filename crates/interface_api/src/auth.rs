//! Authentication and authorization

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind as JwtErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::UserId;
use domain_ledger::Actor;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Turns verified claims into the actor issuing ledger commands
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::InvalidSubject(self.sub.clone()))?;
        if has_role(self, roles::ADMIN) {
            Ok(Actor::admin(user_id))
        } else if has_role(self, roles::USER) {
            Ok(Actor::user(user_id))
        } else {
            Err(AuthError::MissingPermission(roles::USER.to_string()))
        }
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a user id: {0}")]
    InvalidSubject(String),
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims
        .roles
        .iter()
        .any(|r| r == required_role || r == roles::ADMIN)
}

/// Role names carried in tokens
pub mod roles {
    pub const USER: &str = "user";
    pub const ADMIN: &str = "admin";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let user = Uuid::new_v4().to_string();
        let token = create_token(&user, vec![roles::USER.to_string()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user);
        let actor = claims.actor().unwrap();
        assert!(!actor.is_admin);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token("someone", vec![], SECRET, 60).unwrap();
        assert!(matches!(
            validate_token(&token, "other-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            roles: vec![roles::USER.to_string()],
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_admin_implies_user() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            roles: vec![roles::ADMIN.to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(has_role(&claims, roles::USER));
        assert!(claims.actor().unwrap().is_admin);
    }

    #[test]
    fn test_non_uuid_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            roles: vec![roles::USER.to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor(), Err(AuthError::InvalidSubject(_))));
    }

    #[test]
    fn test_roleless_token_has_no_actor() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            roles: vec!["auditor".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor(), Err(AuthError::MissingPermission(_))));
    }
}
