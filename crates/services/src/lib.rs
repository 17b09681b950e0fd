#![forbid(unsafe_code)]

pub mod api;
pub mod bookmark_service;
pub mod course_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;

pub use course_core::Clock;

pub use api::{ApiError, CourseApi, FieldError, Request, Response};
pub use bookmark_service::BookmarkService;
pub use course_service::CourseService;
pub use error::{BookmarkServiceError, CourseServiceError, ProgressServiceError, QuizServiceError};
pub use progress_service::ProgressService;
pub use quiz_service::{QuizService, ScoredAttempt};
