use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use lectern_auth::{AuthError, AuthGate};

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<AuthGate>,
}

/// Resolve the bearer credential on every protected-route request and attach
/// the resulting principal to the request extensions.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let credential = match extract_bearer(req.headers()) {
        Ok(credential) => credential,
        Err(e) => return errors::auth_error_to_response(e),
    };

    match state.gate.authorize(credential).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::Unauthorized("missing credential"))?;

    let header = header
        .to_str()
        .map_err(|_| AuthError::Unauthorized("malformed authorization header"))?;

    // Accept both a bare credential and the conventional Bearer prefix.
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err(AuthError::Unauthorized("missing credential"));
    }

    Ok(token)
}
