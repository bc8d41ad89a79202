//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{info, warn};

use domain_ledger::Actor;

use crate::auth::{validate_token, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "session";

/// Pulls the token from `Authorization: Bearer` or the session cookie
fn extract_token(request: &Request<Body>) -> Option<String> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Authentication middleware
///
/// Validates the JWT and stores both the claims and the derived [`Actor`]
/// in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(&request) else {
        warn!("Missing bearer token or session cookie");
        return Err(ApiError::Unauthorized("Authentication required".to_string()));
    };

    let claims = validate_token(&token, &state.config.jwt_secret).map_err(|e| {
        warn!("Token validation failed: {:?}", e);
        ApiError::Unauthorized(e.to_string())
    })?;
    let actor = claims.actor().map_err(|e| {
        warn!(sub = %claims.sub, "Token rejected: {}", e);
        ApiError::Unauthorized(e.to_string())
    })?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Admin-only guard, layered inside [`auth_middleware`]
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<Actor>() {
        Some(actor) if actor.is_admin => Ok(next.run(request).await),
        Some(actor) => {
            warn!(user = %actor.user_id, uri = %request.uri(), "Admin route denied");
            Err(ApiError::Forbidden("Administrator role required".to_string()))
        }
        None => Err(ApiError::Unauthorized("Authentication required".to_string())),
    }
}

/// Audit logging middleware
///
/// Logs all API requests for compliance and debugging
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_id = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
