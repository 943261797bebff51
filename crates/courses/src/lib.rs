//! `lectern-courses` — course, enrollment, and test records.

pub mod course;

pub use course::{Course, CourseEnrollment, CourseUpdate, EnrollmentRole, NewCourse};
pub use test::{NewTest, NewTestResult, Test, TestResult, TestUpdate};
