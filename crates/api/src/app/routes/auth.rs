//! Public login/authenticate endpoints (phase 1 and 2 of the passwordless
//! flow).

use axum::{extract::Extension, http::header, http::StatusCode, response::IntoResponse, Json};

use lectern_core::user::validate_email;

use crate::app::{dto, errors, AppState};

pub async fn login(
    Extension(state): Extension<AppState>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = validate_email(&body.email) {
        return errors::domain_error_to_response(e);
    }

    match state.flow.login(&body.email).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn authenticate(
    Extension(state): Extension<AppState>,
    Json(body): Json<dto::AuthenticateRequest>,
) -> axum::response::Response {
    if let Err(e) = validate_email(&body.email) {
        return errors::domain_error_to_response(e);
    }
    if body.email_token.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", "emailToken is required");
    }

    match state.flow.authenticate(&body.email, &body.email_token).await {
        // The bearer credential travels in the Authorization response header.
        Ok(bearer) => (StatusCode::OK, [(header::AUTHORIZATION, bearer)], ()).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
