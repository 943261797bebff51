//! Course CRUD and memberships. Reads are open to any authenticated user;
//! mutations require teaching the course (or admin). The creator is enrolled
//! as TEACHER in the same unit that creates the course.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use lectern_auth::{ensure_teacher_of_or_admin, Principal};
use lectern_core::{CourseId, UserId};
use lectern_courses::{CourseUpdate, EnrollmentRole, NewCourse};

use crate::app::routes::tests;
use crate::app::{dto, errors, AppState};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:id", get(get_course).put(update_course).delete(delete_course))
        .route("/:id/members", get(list_members).post(enroll_member))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/tests", get(tests::list_for_course).post(tests::create_for_course))
}

pub async fn list_courses(Extension(state): Extension<AppState>) -> axum::response::Response {
    match state.store.list_courses().await {
        Ok(courses) => {
            let items: Vec<_> = courses.iter().map(dto::course_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_course(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match state.store.get_course(CourseId::new(id)).await {
        Ok(Some(course)) => (StatusCode::OK, Json(dto::course_to_json(&course))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "course not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_course(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CourseInput>,
) -> axum::response::Response {
    let draft = NewCourse {
        name: body.name,
        course_details: body.course_details,
    };
    if let Err(e) = draft.validate() {
        return errors::domain_error_to_response(e);
    }

    match state.store.create_course(draft, principal.user_id).await {
        Ok(course) => (StatusCode::CREATED, Json(dto::course_to_json(&course))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_course(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(body): Json<dto::CourseUpdateInput>,
) -> axum::response::Response {
    if let Err(e) = ensure_teacher_of_or_admin(CourseId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    let update = CourseUpdate {
        name: body.name,
        course_details: body.course_details,
    };
    if let Err(e) = update.validate() {
        return errors::domain_error_to_response(e);
    }

    match state.store.update_course(CourseId::new(id), update).await {
        Ok(course) => (StatusCode::OK, Json(dto::course_to_json(&course))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_course(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(e) = ensure_teacher_of_or_admin(CourseId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    match state.store.delete_course(CourseId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_members(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match state.store.list_course_enrollments(CourseId::new(id)).await {
        Ok(enrollments) => {
            let items: Vec<_> = enrollments.iter().map(dto::enrollment_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn enroll_member(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(body): Json<dto::EnrollInput>,
) -> axum::response::Response {
    if let Err(e) = ensure_teacher_of_or_admin(CourseId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    let role: EnrollmentRole = match body.role.parse() {
        Ok(role) => role,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match state
        .store
        .upsert_enrollment(CourseId::new(id), UserId::new(body.user_id), role)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove_member(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> axum::response::Response {
    if let Err(e) = ensure_teacher_of_or_admin(CourseId::new(id), &principal) {
        return errors::auth_error_to_response(e);
    }

    match state
        .store
        .remove_enrollment(CourseId::new(id), UserId::new(user_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
