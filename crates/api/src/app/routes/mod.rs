use axum::{routing::get, Router};

pub mod auth;
pub mod courses;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/courses", courses::router())
        .nest("/tests", tests::router())
}
