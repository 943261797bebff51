use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use lectern_auth::Principal;

use crate::app::dto;

pub async fn status() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "up": true })))
}

/// Echo the resolved principal (useful for client debugging).
pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(dto::principal_to_json(&principal))
}
