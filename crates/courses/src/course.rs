//! Courses and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lectern_core::{CourseId, DomainError, UserId};

/// A stored course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub course_details: String,
}

/// Role a user holds within a course.
///
/// TEACHER membership is what grants mutation rights over the course and its
/// tests; the authorization gate derives `teacher_of` from these rows on
/// every request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentRole {
    Student,
    Teacher,
}

impl EnrollmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentRole::Student => "STUDENT",
            EnrollmentRole::Teacher => "TEACHER",
        }
    }
}

impl core::fmt::Display for EnrollmentRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EnrollmentRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(EnrollmentRole::Student),
            "TEACHER" => Ok(EnrollmentRole::Teacher),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A user's membership in a course. One row per (user, course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub role: EnrollmentRole,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub course_details: String,
}

impl NewCourse {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("course name cannot be empty"));
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub course_details: Option<String>,
}

impl CourseUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("course name cannot be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_name_must_not_be_blank() {
        let draft = NewCourse {
            name: "  ".to_string(),
            course_details: "Intro".to_string(),
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [EnrollmentRole::Student, EnrollmentRole::Teacher] {
            assert_eq!(role.as_str().parse::<EnrollmentRole>().unwrap(), role);
        }
        assert!("GRADER".parse::<EnrollmentRole>().is_err());
    }
}
