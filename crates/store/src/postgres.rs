//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! sqlx errors are mapped to `StoreError` as follows:
//!
//! | sqlx error | PostgreSQL code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate email / duplicate valid challenge code |
//! | Database (foreign key violation) | `23503` | `NotFound` | Referenced user/course/test does not exist |
//! | RowNotFound | n/a | `NotFound` | Targeted row missing |
//! | anything else | any | `Backend` | Connection, pool, decode failures |
//!
//! ## Atomic units
//!
//! `redeem_challenge`, `delete_user_cascade`, and `create_course` each run in
//! one transaction; enrollment/test/result cascades ride on `ON DELETE
//! CASCADE` foreign keys.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use lectern_auth::{NewToken, StoreError, Token, TokenKind, TokenStore, TokenWithOwner};
use lectern_core::{CourseId, NewUser, TestId, TestResultId, TokenId, User, UserId, UserUpdate};
use lectern_courses::{
    Course, CourseEnrollment, CourseUpdate, EnrollmentRole, NewCourse, NewTest, NewTestResult,
    Test, TestResult, TestUpdate,
};

use crate::app_store::AppStore;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id         BIGSERIAL PRIMARY KEY,
        email      TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name  TEXT NOT NULL DEFAULT '',
        social     JSONB NOT NULL DEFAULT '{}'::jsonb,
        is_admin   BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        id             BIGSERIAL PRIMARY KEY,
        kind           TEXT NOT NULL,
        challenge_code TEXT,
        valid          BOOLEAN NOT NULL DEFAULT TRUE,
        expires_at     TIMESTAMPTZ NOT NULL,
        user_id        BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS tokens_valid_challenge_code
        ON tokens (challenge_code) WHERE valid AND challenge_code IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS courses (
        id             BIGSERIAL PRIMARY KEY,
        name           TEXT NOT NULL,
        course_details TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS course_enrollments (
        user_id    BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course_id  BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        role       TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, course_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tests (
        id        BIGSERIAL PRIMARY KEY,
        course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        name      TEXT NOT NULL,
        date      TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS test_results (
        id         BIGSERIAL PRIMARY KEY,
        test_id    BIGINT NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
        student_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        grader_id  BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        result     BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Postgres-backed store. Cheap to clone; all operations go through the
/// connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables/indexes. Idempotent.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn map_sqlx_error(op: &'static str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StoreError::conflict(format!("{op}: unique violation")),
            Some("23503") => StoreError::NotFound,
            _ => StoreError::backend(format!("{op}: {db}")),
        },
        _ => StoreError::backend(format!("{op}: {e}")),
    }
}

fn decode_error(e: sqlx::Error) -> StoreError {
    StoreError::backend(format!("row decode: {e}"))
}

fn parse_kind(s: &str) -> Result<TokenKind, StoreError> {
    match s {
        "EMAIL_CHALLENGE" => Ok(TokenKind::EmailChallenge),
        "API_SESSION" => Ok(TokenKind::ApiSession),
        other => Err(StoreError::backend(format!("unknown token kind: {other}"))),
    }
}

const TOKEN_COLUMNS: &str = "id, kind, challenge_code, valid, expires_at, user_id, created_at";

fn row_to_token(row: &PgRow) -> Result<Token, StoreError> {
    Ok(Token {
        id: TokenId::new(row.try_get::<i64, _>("id").map_err(decode_error)?),
        kind: parse_kind(&row.try_get::<String, _>("kind").map_err(decode_error)?)?,
        challenge_code: row
            .try_get::<Option<String>, _>("challenge_code")
            .map_err(decode_error)?,
        valid: row.try_get::<bool, _>("valid").map_err(decode_error)?,
        expires_at: row
            .try_get::<DateTime<Utc>, _>("expires_at")
            .map_err(decode_error)?,
        user_id: UserId::new(row.try_get::<i64, _>("user_id").map_err(decode_error)?),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(decode_error)?,
    })
}

fn row_to_token_with_owner(row: &PgRow) -> Result<TokenWithOwner, StoreError> {
    Ok(TokenWithOwner {
        token: row_to_token(row)?,
        owner_email: row.try_get::<String, _>("email").map_err(decode_error)?,
        owner_is_admin: row.try_get::<bool, _>("is_admin").map_err(decode_error)?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::new(row.try_get::<i64, _>("id").map_err(decode_error)?),
        email: row.try_get::<String, _>("email").map_err(decode_error)?,
        first_name: row.try_get::<String, _>("first_name").map_err(decode_error)?,
        last_name: row.try_get::<String, _>("last_name").map_err(decode_error)?,
        social: row
            .try_get::<serde_json::Value, _>("social")
            .map_err(decode_error)?,
        is_admin: row.try_get::<bool, _>("is_admin").map_err(decode_error)?,
    })
}

fn row_to_course(row: &PgRow) -> Result<Course, StoreError> {
    Ok(Course {
        id: CourseId::new(row.try_get::<i64, _>("id").map_err(decode_error)?),
        name: row.try_get::<String, _>("name").map_err(decode_error)?,
        course_details: row
            .try_get::<String, _>("course_details")
            .map_err(decode_error)?,
    })
}

fn row_to_enrollment(row: &PgRow) -> Result<CourseEnrollment, StoreError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    Ok(CourseEnrollment {
        user_id: UserId::new(row.try_get::<i64, _>("user_id").map_err(decode_error)?),
        course_id: CourseId::new(row.try_get::<i64, _>("course_id").map_err(decode_error)?),
        role: role
            .parse::<EnrollmentRole>()
            .map_err(|e| StoreError::backend(e.to_string()))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(decode_error)?,
    })
}

fn row_to_test(row: &PgRow) -> Result<Test, StoreError> {
    Ok(Test {
        id: TestId::new(row.try_get::<i64, _>("id").map_err(decode_error)?),
        course_id: CourseId::new(row.try_get::<i64, _>("course_id").map_err(decode_error)?),
        name: row.try_get::<String, _>("name").map_err(decode_error)?,
        date: row.try_get::<DateTime<Utc>, _>("date").map_err(decode_error)?,
    })
}

fn row_to_result(row: &PgRow) -> Result<TestResult, StoreError> {
    Ok(TestResult {
        id: TestResultId::new(row.try_get::<i64, _>("id").map_err(decode_error)?),
        test_id: TestId::new(row.try_get::<i64, _>("test_id").map_err(decode_error)?),
        student_id: UserId::new(row.try_get::<i64, _>("student_id").map_err(decode_error)?),
        grader_id: UserId::new(row.try_get::<i64, _>("grader_id").map_err(decode_error)?),
        result: row.try_get::<i64, _>("result").map_err(decode_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(decode_error)?,
    })
}

#[async_trait]
impl TokenStore for PgStore {
    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_token", e))?;

        if let Some(code) = &token.challenge_code {
            // Check-before-insert; the partial unique index backs this up
            // against races (23505 -> Conflict).
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM tokens WHERE valid AND challenge_code = $1)",
            )
            .bind(code)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_token", e))?;
            if exists {
                return Err(StoreError::conflict("duplicate challenge code"));
            }
        }

        let row = sqlx::query(&format!(
            "INSERT INTO tokens (kind, challenge_code, valid, expires_at, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(token.kind.as_str())
        .bind(&token.challenge_code)
        .bind(token.valid)
        .bind(token.expires_at)
        .bind(token.user_id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_token", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_token", e))?;
        row_to_token(&row)
    }

    async fn find_token_by_challenge_code(
        &self,
        code: &str,
    ) -> Result<Option<TokenWithOwner>, StoreError> {
        let row = sqlx::query(
            "SELECT t.id, t.kind, t.challenge_code, t.valid, t.expires_at, t.user_id, \
                    t.created_at, u.email, u.is_admin \
             FROM tokens t JOIN users u ON u.id = t.user_id \
             WHERE t.challenge_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_token_by_challenge_code", e))?;
        row.as_ref().map(row_to_token_with_owner).transpose()
    }

    async fn find_token_by_id(&self, id: TokenId) -> Result<Option<TokenWithOwner>, StoreError> {
        let row = sqlx::query(
            "SELECT t.id, t.kind, t.challenge_code, t.valid, t.expires_at, t.user_id, \
                    t.created_at, u.email, u.is_admin \
             FROM tokens t JOIN users u ON u.id = t.user_id \
             WHERE t.id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_token_by_id", e))?;
        row.as_ref().map(row_to_token_with_owner).transpose()
    }

    async fn update_token_validity(&self, id: TokenId, valid: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tokens SET valid = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(valid)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_token_validity", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn redeem_challenge(
        &self,
        challenge_id: TokenId,
        session: NewToken,
    ) -> Result<Token, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("redeem_challenge", e))?;

        let row = sqlx::query(&format!(
            "INSERT INTO tokens (kind, challenge_code, valid, expires_at, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(session.kind.as_str())
        .bind(&session.challenge_code)
        .bind(session.valid)
        .bind(session.expires_at)
        .bind(session.user_id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("redeem_challenge", e))?;

        let invalidated = sqlx::query("UPDATE tokens SET valid = FALSE WHERE id = $1")
            .bind(challenge_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("redeem_challenge", e))?;
        if invalidated.rows_affected() == 0 {
            // Transaction drops here, rolling back the session insert.
            return Err(StoreError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("redeem_challenge", e))?;
        row_to_token(&row)
    }

    async fn find_teacher_course_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<CourseId>, StoreError> {
        let rows: Vec<i64> = sqlx::query_scalar(
            "SELECT course_id FROM course_enrollments WHERE user_id = $1 AND role = 'TEACHER'",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_teacher_course_ids", e))?;
        Ok(rows.into_iter().map(CourseId::new).collect())
    }

    async fn upsert_user_by_email(&self, email: &str) -> Result<UserId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
             RETURNING id",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user_by_email", e))?;
        Ok(UserId::new(id))
    }

    async fn delete_user_cascade(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_user_cascade", e))?;

        sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user_cascade", e))?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user_cascade", e))?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_user_cascade", e))
    }
}

#[async_trait]
impl AppStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, email, first_name, last_name, social, is_admin FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, first_name, last_name, social, is_admin FROM users WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_user(&self, draft: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (email, first_name, last_name, social) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, email, first_name, last_name, social, is_admin",
        )
        .bind(&draft.email)
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.social)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        row_to_user(&row)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let row = sqlx::query(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                first_name = COALESCE($3, first_name), \
                last_name = COALESCE($4, last_name), \
                social = COALESCE($5, social) \
             WHERE id = $1 \
             RETURNING id, email, first_name, last_name, social, is_admin",
        )
        .bind(id.as_i64())
        .bind(update.email)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.social)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        row.as_ref().map(row_to_user).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let rows = sqlx::query("SELECT id, name, course_details FROM courses ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_courses", e))?;
        rows.iter().map(row_to_course).collect()
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query("SELECT id, name, course_details FROM courses WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_course", e))?;
        row.as_ref().map(row_to_course).transpose()
    }

    async fn create_course(&self, draft: NewCourse, creator: UserId) -> Result<Course, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_course", e))?;

        let row = sqlx::query(
            "INSERT INTO courses (name, course_details) VALUES ($1, $2) \
             RETURNING id, name, course_details",
        )
        .bind(&draft.name)
        .bind(&draft.course_details)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_course", e))?;
        let course = row_to_course(&row)?;

        sqlx::query(
            "INSERT INTO course_enrollments (user_id, course_id, role) VALUES ($1, $2, 'TEACHER')",
        )
        .bind(creator.as_i64())
        .bind(course.id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_course", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_course", e))?;
        Ok(course)
    }

    async fn update_course(&self, id: CourseId, update: CourseUpdate) -> Result<Course, StoreError> {
        let row = sqlx::query(
            "UPDATE courses SET \
                name = COALESCE($2, name), \
                course_details = COALESCE($3, course_details) \
             WHERE id = $1 \
             RETURNING id, name, course_details",
        )
        .bind(id.as_i64())
        .bind(update.name)
        .bind(update.course_details)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_course", e))?;
        row.as_ref().map(row_to_course).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_course", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_course_enrollments(
        &self,
        course: CourseId,
    ) -> Result<Vec<CourseEnrollment>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, role, created_at FROM course_enrollments \
             WHERE course_id = $1 ORDER BY created_at",
        )
        .bind(course.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_course_enrollments", e))?;
        rows.iter().map(row_to_enrollment).collect()
    }

    async fn upsert_enrollment(
        &self,
        course: CourseId,
        user: UserId,
        role: EnrollmentRole,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO course_enrollments (user_id, course_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, course_id) DO UPDATE SET role = EXCLUDED.role",
        )
        .bind(user.as_i64())
        .bind(course.as_i64())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_enrollment", e))?;
        Ok(())
    }

    async fn remove_enrollment(&self, course: CourseId, user: UserId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM course_enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user.as_i64())
        .bind(course.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_enrollment", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_course_tests(&self, course: CourseId) -> Result<Vec<Test>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, course_id, name, date FROM tests WHERE course_id = $1 ORDER BY id",
        )
        .bind(course.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_course_tests", e))?;
        rows.iter().map(row_to_test).collect()
    }

    async fn get_test(&self, id: TestId) -> Result<Option<Test>, StoreError> {
        let row = sqlx::query("SELECT id, course_id, name, date FROM tests WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_test", e))?;
        row.as_ref().map(row_to_test).transpose()
    }

    async fn create_test(&self, draft: NewTest) -> Result<Test, StoreError> {
        let row = sqlx::query(
            "INSERT INTO tests (course_id, name, date) VALUES ($1, $2, $3) \
             RETURNING id, course_id, name, date",
        )
        .bind(draft.course_id.as_i64())
        .bind(&draft.name)
        .bind(draft.date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_test", e))?;
        row_to_test(&row)
    }

    async fn update_test(&self, id: TestId, update: TestUpdate) -> Result<Test, StoreError> {
        let row = sqlx::query(
            "UPDATE tests SET \
                name = COALESCE($2, name), \
                date = COALESCE($3, date) \
             WHERE id = $1 \
             RETURNING id, course_id, name, date",
        )
        .bind(id.as_i64())
        .bind(update.name)
        .bind(update.date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_test", e))?;
        row.as_ref().map(row_to_test).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete_test(&self, id: TestId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_test", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_test_result(&self, draft: NewTestResult) -> Result<TestResult, StoreError> {
        let row = sqlx::query(
            "INSERT INTO test_results (test_id, student_id, grader_id, result) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, test_id, student_id, grader_id, result, created_at",
        )
        .bind(draft.test_id.as_i64())
        .bind(draft.student_id.as_i64())
        .bind(draft.grader_id.as_i64())
        .bind(draft.result)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_test_result", e))?;
        row_to_result(&row)
    }

    async fn list_results_for_test(&self, test: TestId) -> Result<Vec<TestResult>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, test_id, student_id, grader_id, result, created_at \
             FROM test_results WHERE test_id = $1 ORDER BY id",
        )
        .bind(test.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_results_for_test", e))?;
        rows.iter().map(row_to_result).collect()
    }

    async fn list_results_for_student(
        &self,
        student: UserId,
    ) -> Result<Vec<TestResult>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, test_id, student_id, grader_id, result, created_at \
             FROM test_results WHERE student_id = $1 ORDER BY id",
        )
        .bind(student.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_results_for_student", e))?;
        rows.iter().map(row_to_result).collect()
    }
}
