//! HTTP API Layer
//!
//! This crate provides the REST API for the fractional real-estate ledger
//! using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each ledger service
//! - **Middleware**: Authentication, admin guard, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: `{error, code, message}` bodies with stable codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(Arc::new(PostgresLedgerAdapter::new(pool)), config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_ledger::{LedgerPort, LedgerServices, LedgerSettings};

use crate::config::ApiConfig;
use crate::middleware::{admin_middleware, auth_middleware, audit_middleware};
use crate::handlers::{dividend, health, investment, kyc, market, property, wallet};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: LedgerServices,
    pub port: Arc<dyn LedgerPort>,
    pub settings: LedgerSettings,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the ledger services over `port` using the configured settings
    pub fn new(port: Arc<dyn LedgerPort>, config: ApiConfig) -> Result<Self, ::config::ConfigError> {
        let settings = config.ledger_settings()?;
        Ok(Self {
            services: LedgerServices::new(port.clone(), settings),
            port,
            settings,
            config,
        })
    }
}

/// Creates the main API router
///
/// Property browsing and health checks are public; every other route needs
/// a valid token, and `/api/v1/admin` additionally the admin role.
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let catalogue_routes = Router::new()
        .route("/properties", get(property::list_properties))
        .route("/properties/:id", get(property::get_property));

    // Investor routes
    let investor_routes = Router::new()
        .route("/investments/quote", get(investment::quote))
        .route("/investments", post(investment::invest).get(investment::portfolio))
        .route("/kyc/profile", get(kyc::get_profile))
        .route("/kyc/documents", post(kyc::submit_document))
        .route("/transactions", get(wallet::list_transactions))
        .route("/transactions/deposit", post(wallet::deposit))
        .route("/transactions/withdraw", post(wallet::withdraw))
        .route("/market/orders", post(market::place_order).get(market::list_orders))
        .route("/market/orders/:id", delete(market::cancel_order))
        .route("/market/properties/:id/book", get(market::order_book))
        .route("/market/properties/:id/trades", get(market::list_trades))
        .route("/properties/:id/dividends", get(dividend::list_dividends))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes
    let admin_routes = Router::new()
        .route("/properties", post(property::create_property))
        .route("/properties/:id/status", put(property::update_status))
        .route("/properties/:id/documents", post(property::add_document))
        .route("/properties/:id/due-diligence", put(property::record_due_diligence))
        .route("/properties/:id/dividends", post(dividend::distribute))
        .route("/kyc/documents/:id/review", post(kyc::review_document))
        .route("/transactions/:id/confirm", post(investment::confirm_payment))
        .route("/investments/:id/refund", post(investment::refund_investment))
        .layer(axum_middleware::from_fn(admin_middleware))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .merge(catalogue_routes)
        .merge(investor_routes)
        .nest("/admin", admin_routes);

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
