//! CRUD store surface consumed by the HTTP layer.

use async_trait::async_trait;

use lectern_auth::{StoreError, TokenStore};
use lectern_core::{CourseId, NewUser, TestId, User, UserId, UserUpdate};
use lectern_courses::{
    Course, CourseEnrollment, CourseUpdate, EnrollmentRole, NewCourse, NewTest, NewTestResult,
    Test, TestResult, TestUpdate,
};

/// Keyed CRUD storage for the course-management domain.
///
/// Pass-through reads/writes; the only multi-write units are course creation
/// (course + creator's TEACHER enrollment) and the cascades, which
/// implementations must keep atomic.
#[async_trait]
pub trait AppStore: TokenStore {
    // Users
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    /// Rejects a duplicate email with [`StoreError::Conflict`].
    async fn create_user(&self, draft: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError>;

    // Courses
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StoreError>;
    /// Creates the course and enrolls `creator` as TEACHER in one unit.
    async fn create_course(&self, draft: NewCourse, creator: UserId) -> Result<Course, StoreError>;
    async fn update_course(&self, id: CourseId, update: CourseUpdate) -> Result<Course, StoreError>;
    /// Cascades over enrollments, tests, and their results.
    async fn delete_course(&self, id: CourseId) -> Result<(), StoreError>;

    // Enrollments
    async fn list_course_enrollments(
        &self,
        course: CourseId,
    ) -> Result<Vec<CourseEnrollment>, StoreError>;
    async fn upsert_enrollment(
        &self,
        course: CourseId,
        user: UserId,
        role: EnrollmentRole,
    ) -> Result<(), StoreError>;
    async fn remove_enrollment(&self, course: CourseId, user: UserId) -> Result<(), StoreError>;

    // Tests
    async fn list_course_tests(&self, course: CourseId) -> Result<Vec<Test>, StoreError>;
    async fn get_test(&self, id: TestId) -> Result<Option<Test>, StoreError>;
    async fn create_test(&self, draft: NewTest) -> Result<Test, StoreError>;
    async fn update_test(&self, id: TestId, update: TestUpdate) -> Result<Test, StoreError>;
    async fn delete_test(&self, id: TestId) -> Result<(), StoreError>;

    // Test results
    async fn create_test_result(&self, draft: NewTestResult) -> Result<TestResult, StoreError>;
    async fn list_results_for_test(&self, test: TestId) -> Result<Vec<TestResult>, StoreError>;
    async fn list_results_for_student(
        &self,
        student: UserId,
    ) -> Result<Vec<TestResult>, StoreError>;
}
