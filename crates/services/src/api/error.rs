use serde::{Deserialize, Serialize};
use thiserror::Error;

use course_core::model::ProgressError;

use crate::error::{
    BookmarkServiceError, CourseServiceError, ProgressServiceError, QuizServiceError,
};

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The two kinds of failure a caller can see.
///
/// Validation failures carry field detail; operation failures only name the
/// operation, and their source is logged, never returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("Invalid data")]
    Validation(Vec<FieldError>),
    #[error("Failed to {operation}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub(crate) fn operation(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Operation {
            operation,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}

/// Sorts a service error into one of the two outward kinds.
pub(crate) trait IntoApiError: std::error::Error + Send + Sync + Sized + 'static {
    /// Field detail when the error was caused by the request itself.
    fn field_errors(&self) -> Option<Vec<FieldError>>;

    fn into_api_error(self, operation: &'static str) -> ApiError {
        match self.field_errors() {
            Some(details) => ApiError::Validation(details),
            None => ApiError::operation(operation, self),
        }
    }
}

fn single(field: &str, message: impl ToString) -> Option<Vec<FieldError>> {
    Some(vec![FieldError::new(field, message.to_string())])
}

impl IntoApiError for ProgressServiceError {
    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            ProgressServiceError::UnknownModule(_) => single("moduleId", self),
            ProgressServiceError::Progress(err @ ProgressError::InvalidQuizScore(_)) => {
                single("quizScore", err)
            }
            _ => None,
        }
    }
}

impl IntoApiError for QuizServiceError {
    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            QuizServiceError::UnknownModule(_) | QuizServiceError::NoQuiz(_) => {
                single("moduleId", self)
            }
            QuizServiceError::InvalidScore(_) | QuizServiceError::ScoreMismatch { .. } => {
                single("score", self)
            }
            QuizServiceError::PassedMismatch { .. } => single("passed", self),
            QuizServiceError::Incomplete { missing } => Some(
                missing
                    .iter()
                    .map(|question| FieldError::new(format!("answers.{question}"), "Required"))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl IntoApiError for BookmarkServiceError {
    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            BookmarkServiceError::UnknownModule(_) => single("moduleId", self),
            BookmarkServiceError::EmptyField(field) => single(field, self),
            _ => None,
        }
    }
}

impl IntoApiError for CourseServiceError {
    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            CourseServiceError::UnknownUser(_) => single("userId", self),
            _ => None,
        }
    }
}
