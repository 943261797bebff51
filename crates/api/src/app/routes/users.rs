//! User CRUD. Reads and writes on a specific user are self-or-admin;
//! listing and explicit creation are admin-only.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use lectern_auth::{ensure_admin, ensure_self_or_admin, Principal};
use lectern_core::{NewUser, UserId, UserUpdate};

use crate::app::{dto, errors, AppState};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/results", get(list_user_results))
}

pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(e) = ensure_admin(&principal) {
        return errors::auth_error_to_response(e);
    }

    match state.store.list_users().await {
        Ok(users) => {
            let items: Vec<_> = users.iter().map(dto::user_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::UserInput>,
) -> axum::response::Response {
    if let Err(e) = ensure_admin(&principal) {
        return errors::auth_error_to_response(e);
    }

    let draft = NewUser {
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        social: body.social.unwrap_or_else(|| serde_json::json!({})),
    };
    if let Err(e) = draft.validate() {
        return errors::domain_error_to_response(e);
    }

    match state.store.create_user(draft).await {
        Ok(user) => {
            (StatusCode::CREATED, Json(serde_json::json!({ "id": user.id }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(e) = ensure_self_or_admin(UserId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    match state.store.get_user(UserId::new(id)).await {
        Ok(Some(user)) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(body): Json<dto::UserUpdateInput>,
) -> axum::response::Response {
    if let Err(e) = ensure_self_or_admin(UserId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    let update = UserUpdate {
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        social: body.social,
    };
    if let Err(e) = update.validate() {
        return errors::domain_error_to_response(e);
    }

    match state.store.update_user(UserId::new(id), update).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(e) = ensure_self_or_admin(UserId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    // Tokens go with the user (single atomic unit in the store).
    match state.store.delete_user_cascade(UserId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_user_results(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(e) = ensure_self_or_admin(UserId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    match state.store.list_results_for_student(UserId::new(id)).await {
        Ok(results) => {
            let items: Vec<_> = results.iter().map(dto::test_result_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
