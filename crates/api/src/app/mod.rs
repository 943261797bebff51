//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use lectern_auth::{AuthConfig, AuthFlow, AuthGate, NotificationSink, TokenStore};
use lectern_store::AppStore;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Everything the handlers need, injected once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AppStore>,
    pub flow: Arc<AuthFlow>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new<S>(config: &AuthConfig, store: Arc<S>, sink: Arc<dyn NotificationSink>) -> Self
    where
        S: AppStore + 'static,
    {
        let token_store: Arc<dyn TokenStore> = store.clone();
        Self {
            flow: Arc::new(AuthFlow::new(config, token_store.clone(), sink)),
            gate: Arc::new(AuthGate::new(config, token_store)),
            store,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    let auth_state = middleware::AuthState {
        gate: state.gate.clone(),
    };

    // Protected routes: require a resolved principal.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/status", get(routes::system::status))
        .route("/login", post(routes::auth::login))
        .route("/authenticate", post(routes::auth::authenticate))
        .merge(protected)
        .layer(Extension(state))
}
