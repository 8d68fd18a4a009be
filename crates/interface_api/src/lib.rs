//! HTTP API Layer
//!
//! REST boundary for the stall arrears core using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource, each checking a capability
//!   before calling the core
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: domain errors mapped to consistent JSON responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(store, api_config, arrears_config);
//! axum::serve(listener, app).await?;
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
    routing::{get, post},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_arrears::{ArrearsConfig, ArrearsEngine, LedgerStore};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{accruals, arrears, health, leases, payments};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ArrearsEngine,
    pub store: Arc<dyn LedgerStore>,
    pub config: ApiConfig,
    pub arrears: ArrearsConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `store` - Ledger store shared by every component
/// * `config` - API configuration
/// * `arrears` - Engine settings (penalty rate, interval, timezone)
pub fn create_router(store: Arc<dyn LedgerStore>, config: ApiConfig, arrears: ArrearsConfig) -> Router {
    let engine = ArrearsEngine::new(Arc::clone(&store), &arrears);
    let state = AppState {
        engine,
        store,
        config,
        arrears,
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let lease_routes = Router::new()
        .route("/", post(leases::open_lease))
        .route("/:id", get(leases::get_lease))
        .route("/:id/close", post(leases::close_lease))
        .route("/:id/dues", post(leases::schedule_due))
        .route("/:id/payments", post(payments::record_payment))
        .route("/:id/not-paid", post(payments::mark_not_paid))
        .route("/:id/arrears", get(arrears::get_balance))
        .route("/:id/arrears/settle", post(arrears::settle_arrear))
        .route("/:id/arrears/history", get(arrears::get_history));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/leases", lease_routes)
        .route("/accruals", post(accruals::run_accrual))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            // x-request-id is assigned before tracing and auth see the request
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Installs the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `log_level`.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
