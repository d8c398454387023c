//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::{Authenticator, TokenService};
use crate::handlers::{BeneficiaryHandler, LoanHandler, PaymentHandler};
use crate::messages::Messages;
use crate::store::{BeneficiaryStore, CredentialStore, LoanStore, PaymentStore};

pub use routes::create_router;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub beneficiaries: BeneficiaryHandler,
    pub loans: LoanHandler,
    pub payments: PaymentHandler,
    pub authenticator: Authenticator,
    pub max_image_bytes: usize,
}

impl AppState {
    /// Wire the handlers over one store implementing every storage trait
    pub fn new<S>(
        store: S,
        tokens: Arc<TokenService>,
        messages: Messages,
        max_image_bytes: usize,
    ) -> Self
    where
        S: BeneficiaryStore + LoanStore + PaymentStore + CredentialStore + Clone + 'static,
    {
        let beneficiaries = BeneficiaryHandler::new(Arc::new(store.clone()), messages.clone());
        let loans = LoanHandler::new(
            Arc::new(store.clone()),
            beneficiaries.clone(),
            messages.clone(),
        );
        let payments = PaymentHandler::new(Arc::new(store.clone()), loans.clone(), messages.clone());
        let authenticator = Authenticator::new(Arc::new(store), tokens, messages);

        Self {
            beneficiaries,
            loans,
            payments,
            authenticator,
            max_image_bytes,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run last-added first: trace -> context -> logging -> auth -> handler
    let protected_routes = create_router(state.max_image_bytes).layer(from_fn_with_state(
        state.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(routes::login))
        .nest("/api", protected_routes)
        .layer(from_fn(middleware::logging_middleware))
        .layer(from_fn(middleware::context_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
