//! In-memory store.
//!
//! Intended for tests/dev. Not optimized for performance; a single `RwLock`
//! around the whole state doubles as the transaction boundary for the
//! multi-write units.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use lectern_auth::{NewToken, StoreError, Token, TokenStore, TokenWithOwner};
use lectern_core::{CourseId, NewUser, TestId, TestResultId, TokenId, User, UserId, UserUpdate};
use lectern_courses::{
    Course, CourseEnrollment, CourseUpdate, EnrollmentRole, NewCourse, NewTest, NewTestResult,
    Test, TestResult, TestUpdate,
};

use crate::app_store::AppStore;

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<TokenId, Token>,
    courses: BTreeMap<CourseId, Course>,
    enrollments: Vec<CourseEnrollment>,
    tests: BTreeMap<TestId, Test>,
    results: BTreeMap<TestResultId, TestResult>,
    next_user_id: i64,
    next_token_id: i64,
    next_course_id: i64,
    next_test_id: i64,
    next_result_id: i64,
}

impl State {
    fn token_with_owner(&self, token: &Token) -> Result<TokenWithOwner, StoreError> {
        let owner = self.users.get(&token.user_id).ok_or(StoreError::NotFound)?;
        Ok(TokenWithOwner {
            token: token.clone(),
            owner_email: owner.email.clone(),
            owner_is_admin: owner.is_admin,
        })
    }

    fn insert_token(&mut self, token: NewToken) -> Token {
        self.next_token_id += 1;
        let stored = Token {
            id: TokenId::new(self.next_token_id),
            kind: token.kind,
            challenge_code: token.challenge_code,
            valid: token.valid,
            expires_at: token.expires_at,
            user_id: token.user_id,
            created_at: Utc::now(),
        };
        self.tokens.insert(stored.id, stored.clone());
        stored
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::backend("lock poisoned"))
    }

    /// All tokens owned by `user`, in creation order (dev/test helper).
    pub fn tokens_for_user(&self, user: UserId) -> Vec<Token> {
        match self.read() {
            Ok(state) => state.tokens.values().filter(|t| t.user_id == user).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Flip a user's admin flag (dev/test seeding helper; production admin
    /// grants happen directly in the database).
    pub fn set_admin(&self, user: UserId, is_admin: bool) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let user = state.users.get_mut(&user).ok_or(StoreError::NotFound)?;
        user.is_admin = is_admin;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError> {
        let mut state = self.write()?;
        if let Some(code) = &token.challenge_code {
            // Uniqueness among *valid* challenges is a store invariant.
            let duplicate = state
                .tokens
                .values()
                .any(|t| t.valid && t.challenge_code.as_deref() == Some(code));
            if duplicate {
                return Err(StoreError::conflict("duplicate challenge code"));
            }
        }
        if !state.users.contains_key(&token.user_id) {
            return Err(StoreError::NotFound);
        }
        Ok(state.insert_token(token))
    }

    async fn find_token_by_challenge_code(
        &self,
        code: &str,
    ) -> Result<Option<TokenWithOwner>, StoreError> {
        let state = self.read()?;
        state
            .tokens
            .values()
            .find(|t| t.challenge_code.as_deref() == Some(code))
            .map(|t| state.token_with_owner(t))
            .transpose()
    }

    async fn find_token_by_id(&self, id: TokenId) -> Result<Option<TokenWithOwner>, StoreError> {
        let state = self.read()?;
        state
            .tokens
            .get(&id)
            .map(|t| state.token_with_owner(t))
            .transpose()
    }

    async fn update_token_validity(&self, id: TokenId, valid: bool) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let token = state.tokens.get_mut(&id).ok_or(StoreError::NotFound)?;
        token.valid = valid;
        Ok(())
    }

    async fn redeem_challenge(
        &self,
        challenge_id: TokenId,
        session: NewToken,
    ) -> Result<Token, StoreError> {
        // One write-lock section = one atomic unit: the session appears and
        // the challenge dies together, or neither happens.
        let mut state = self.write()?;
        if !state.tokens.contains_key(&challenge_id) {
            return Err(StoreError::NotFound);
        }
        let stored = state.insert_token(session);
        state
            .tokens
            .get_mut(&challenge_id)
            .ok_or_else(|| StoreError::backend("challenge vanished mid-redemption"))?
            .valid = false;
        Ok(stored)
    }

    async fn find_teacher_course_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<CourseId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id && e.role == EnrollmentRole::Teacher)
            .map(|e| e.course_id)
            .collect())
    }

    async fn upsert_user_by_email(&self, email: &str) -> Result<UserId, StoreError> {
        let mut state = self.write()?;
        if let Some(user) = state.users.values().find(|u| u.email == email) {
            return Ok(user.id);
        }
        state.next_user_id += 1;
        let id = UserId::new(state.next_user_id);
        state.users.insert(
            id,
            User {
                id,
                email: email.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                social: serde_json::json!({}),
                is_admin: false,
            },
        );
        Ok(id)
    }

    async fn delete_user_cascade(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&user_id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.tokens.retain(|_, t| t.user_id != user_id);
        state.enrollments.retain(|e| e.user_id != user_id);
        state
            .results
            .retain(|_, r| r.student_id != user_id && r.grader_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn create_user(&self, draft: NewUser) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == draft.email) {
            return Err(StoreError::conflict("email already registered"));
        }
        state.next_user_id += 1;
        let id = UserId::new(state.next_user_id);
        let user = User {
            id,
            email: draft.email,
            first_name: draft.first_name,
            last_name: draft.last_name,
            social: draft.social,
            is_admin: false,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if let Some(email) = &update.email {
            if state.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::conflict("email already registered"));
            }
        }
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(social) = update.social {
            user.social = social;
        }
        Ok(user.clone())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.read()?.courses.values().cloned().collect())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.read()?.courses.get(&id).cloned())
    }

    async fn create_course(&self, draft: NewCourse, creator: UserId) -> Result<Course, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&creator) {
            return Err(StoreError::NotFound);
        }
        state.next_course_id += 1;
        let id = CourseId::new(state.next_course_id);
        let course = Course {
            id,
            name: draft.name,
            course_details: draft.course_details,
        };
        state.courses.insert(id, course.clone());
        state.enrollments.push(CourseEnrollment {
            user_id: creator,
            course_id: id,
            role: EnrollmentRole::Teacher,
            created_at: Utc::now(),
        });
        Ok(course)
    }

    async fn update_course(&self, id: CourseId, update: CourseUpdate) -> Result<Course, StoreError> {
        let mut state = self.write()?;
        let course = state.courses.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = update.name {
            course.name = name;
        }
        if let Some(course_details) = update.course_details {
            course.course_details = course_details;
        }
        Ok(course.clone())
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.courses.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.enrollments.retain(|e| e.course_id != id);
        let dead_tests: Vec<TestId> = state
            .tests
            .values()
            .filter(|t| t.course_id == id)
            .map(|t| t.id)
            .collect();
        state.tests.retain(|_, t| t.course_id != id);
        state.results.retain(|_, r| !dead_tests.contains(&r.test_id));
        Ok(())
    }

    async fn list_course_enrollments(
        &self,
        course: CourseId,
    ) -> Result<Vec<CourseEnrollment>, StoreError> {
        Ok(self
            .read()?
            .enrollments
            .iter()
            .filter(|e| e.course_id == course)
            .cloned()
            .collect())
    }

    async fn upsert_enrollment(
        &self,
        course: CourseId,
        user: UserId,
        role: EnrollmentRole,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.courses.contains_key(&course) || !state.users.contains_key(&user) {
            return Err(StoreError::NotFound);
        }
        if let Some(existing) = state
            .enrollments
            .iter_mut()
            .find(|e| e.course_id == course && e.user_id == user)
        {
            existing.role = role;
        } else {
            state.enrollments.push(CourseEnrollment {
                user_id: user,
                course_id: course,
                role,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn remove_enrollment(&self, course: CourseId, user: UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let before = state.enrollments.len();
        state
            .enrollments
            .retain(|e| !(e.course_id == course && e.user_id == user));
        if state.enrollments.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_course_tests(&self, course: CourseId) -> Result<Vec<Test>, StoreError> {
        Ok(self
            .read()?
            .tests
            .values()
            .filter(|t| t.course_id == course)
            .cloned()
            .collect())
    }

    async fn get_test(&self, id: TestId) -> Result<Option<Test>, StoreError> {
        Ok(self.read()?.tests.get(&id).cloned())
    }

    async fn create_test(&self, draft: NewTest) -> Result<Test, StoreError> {
        let mut state = self.write()?;
        if !state.courses.contains_key(&draft.course_id) {
            return Err(StoreError::NotFound);
        }
        state.next_test_id += 1;
        let id = TestId::new(state.next_test_id);
        let test = Test {
            id,
            course_id: draft.course_id,
            name: draft.name,
            date: draft.date,
        };
        state.tests.insert(id, test.clone());
        Ok(test)
    }

    async fn update_test(&self, id: TestId, update: TestUpdate) -> Result<Test, StoreError> {
        let mut state = self.write()?;
        let test = state.tests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = update.name {
            test.name = name;
        }
        if let Some(date) = update.date {
            test.date = date;
        }
        Ok(test.clone())
    }

    async fn delete_test(&self, id: TestId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.tests.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.results.retain(|_, r| r.test_id != id);
        Ok(())
    }

    async fn create_test_result(&self, draft: NewTestResult) -> Result<TestResult, StoreError> {
        let mut state = self.write()?;
        if !state.tests.contains_key(&draft.test_id)
            || !state.users.contains_key(&draft.student_id)
            || !state.users.contains_key(&draft.grader_id)
        {
            return Err(StoreError::NotFound);
        }
        state.next_result_id += 1;
        let id = TestResultId::new(state.next_result_id);
        let result = TestResult {
            id,
            test_id: draft.test_id,
            student_id: draft.student_id,
            grader_id: draft.grader_id,
            result: draft.result,
            created_at: Utc::now(),
        };
        state.results.insert(id, result.clone());
        Ok(result)
    }

    async fn list_results_for_test(&self, test: TestId) -> Result<Vec<TestResult>, StoreError> {
        Ok(self
            .read()?
            .results
            .values()
            .filter(|r| r.test_id == test)
            .cloned()
            .collect())
    }

    async fn list_results_for_student(
        &self,
        student: UserId,
    ) -> Result<Vec<TestResult>, StoreError> {
        Ok(self
            .read()?
            .results
            .values()
            .filter(|r| r.student_id == student)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lectern_auth::TokenKind;

    fn challenge(code: &str, user: UserId) -> NewToken {
        NewToken::email_challenge(code, Utc::now() + Duration::minutes(10), user)
    }

    #[tokio::test]
    async fn upsert_reuses_users_by_email() {
        let store = MemoryStore::new();
        let first = store.upsert_user_by_email("a@x.com").await.unwrap();
        let second = store.upsert_user_by_email("a@x.com").await.unwrap();
        let other = store.upsert_user_by_email("b@x.com").await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn duplicate_valid_challenge_code_is_rejected() {
        let store = MemoryStore::new();
        let user = store.upsert_user_by_email("a@x.com").await.unwrap();
        store.create_token(challenge("12345678", user)).await.unwrap();

        let err = store.create_token(challenge("12345678", user)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalidated_challenge_code_can_be_reissued() {
        let store = MemoryStore::new();
        let user = store.upsert_user_by_email("a@x.com").await.unwrap();
        let first = store.create_token(challenge("12345678", user)).await.unwrap();
        store.update_token_validity(first.id, false).await.unwrap();

        assert!(store.create_token(challenge("12345678", user)).await.is_ok());
    }

    #[tokio::test]
    async fn redeem_mints_session_and_kills_challenge_together() {
        let store = MemoryStore::new();
        let user = store.upsert_user_by_email("a@x.com").await.unwrap();
        let ch = store.create_token(challenge("12345678", user)).await.unwrap();

        let session = store
            .redeem_challenge(ch.id, NewToken::api_session(Utc::now() + Duration::hours(12), user))
            .await
            .unwrap();
        assert_eq!(session.kind, TokenKind::ApiSession);
        assert!(session.valid);

        let ch = store.find_token_by_id(ch.id).await.unwrap().unwrap();
        assert!(!ch.token.valid);
    }

    #[tokio::test]
    async fn delete_user_cascades_over_tokens() {
        let store = MemoryStore::new();
        let user = store.upsert_user_by_email("a@x.com").await.unwrap();
        let token = store.create_token(challenge("12345678", user)).await.unwrap();

        store.delete_user_cascade(user).await.unwrap();

        assert!(store.get_user(user).await.unwrap().is_none());
        assert!(store.find_token_by_id(token.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_user_cascade(user).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn course_creator_is_enrolled_as_teacher() {
        let store = MemoryStore::new();
        let user = store.upsert_user_by_email("t@x.com").await.unwrap();
        let course = store
            .create_course(
                NewCourse {
                    name: "Rust 101".to_string(),
                    course_details: "Ownership and friends".to_string(),
                },
                user,
            )
            .await
            .unwrap();

        let teaching = store.find_teacher_course_ids(user).await.unwrap();
        assert!(teaching.contains(&course.id));
    }

    #[tokio::test]
    async fn student_enrollment_does_not_grant_teaching() {
        let store = MemoryStore::new();
        let teacher = store.upsert_user_by_email("t@x.com").await.unwrap();
        let student = store.upsert_user_by_email("s@x.com").await.unwrap();
        let course = store
            .create_course(
                NewCourse {
                    name: "Rust 101".to_string(),
                    course_details: String::new(),
                },
                teacher,
            )
            .await
            .unwrap();
        store
            .upsert_enrollment(course.id, student, EnrollmentRole::Student)
            .await
            .unwrap();

        assert!(store.find_teacher_course_ids(student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_course_cascades_tests_and_results() {
        let store = MemoryStore::new();
        let teacher = store.upsert_user_by_email("t@x.com").await.unwrap();
        let student = store.upsert_user_by_email("s@x.com").await.unwrap();
        let course = store
            .create_course(
                NewCourse {
                    name: "Rust 101".to_string(),
                    course_details: String::new(),
                },
                teacher,
            )
            .await
            .unwrap();
        let test = store
            .create_test(NewTest {
                course_id: course.id,
                name: "Midterm".to_string(),
                date: Utc::now(),
            })
            .await
            .unwrap();
        store
            .create_test_result(NewTestResult {
                test_id: test.id,
                student_id: student,
                grader_id: teacher,
                result: 87,
            })
            .await
            .unwrap();

        store.delete_course(course.id).await.unwrap();

        assert!(store.get_test(test.id).await.unwrap().is_none());
        assert!(store.list_results_for_student(student).await.unwrap().is_empty());
        assert!(store.find_teacher_course_ids(teacher).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_on_create_user_conflicts() {
        let store = MemoryStore::new();
        let draft = NewUser {
            email: "a@x.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            social: serde_json::json!({}),
        };
        store.create_user(draft.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(draft).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
