//! Request/response DTOs and JSON mapping helpers.
//!
//! Wire format is camelCase (`firstName`, `emailToken`, ...).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use lectern_auth::Principal;
use lectern_core::User;
use lectern_courses::{Course, CourseEnrollment, Test, TestResult};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub email: String,
    pub email_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub social: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub social: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub name: String,
    #[serde(default)]
    pub course_details: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdateInput {
    pub name: Option<String>,
    pub course_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollInput {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInput {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestUpdateInput {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultInput {
    pub student_id: i64,
    pub result: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

pub fn user_to_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
        "social": user.social,
        "isAdmin": user.is_admin,
    })
}

pub fn course_to_json(course: &Course) -> serde_json::Value {
    json!({
        "id": course.id,
        "name": course.name,
        "courseDetails": course.course_details,
    })
}

pub fn enrollment_to_json(enrollment: &CourseEnrollment) -> serde_json::Value {
    json!({
        "userId": enrollment.user_id,
        "courseId": enrollment.course_id,
        "role": enrollment.role,
        "createdAt": enrollment.created_at,
    })
}

pub fn test_to_json(test: &Test) -> serde_json::Value {
    json!({
        "id": test.id,
        "courseId": test.course_id,
        "name": test.name,
        "date": test.date,
    })
}

pub fn test_result_to_json(result: &TestResult) -> serde_json::Value {
    json!({
        "id": result.id,
        "testId": result.test_id,
        "studentId": result.student_id,
        "graderId": result.grader_id,
        "result": result.result,
        "createdAt": result.created_at,
    })
}

pub fn principal_to_json(principal: &Principal) -> serde_json::Value {
    let mut teacher_of: Vec<i64> = principal.teacher_of.iter().map(|c| c.as_i64()).collect();
    teacher_of.sort_unstable();
    json!({
        "userId": principal.user_id,
        "tokenId": principal.token_id,
        "isAdmin": principal.is_admin,
        "teacherOf": teacher_of,
    })
}
