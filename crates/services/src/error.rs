//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{ModuleId, ProgressError, QuestionId, UserId};
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("module {0} is not in the catalog")]
    UnknownModule(ModuleId),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("module {0} is not in the catalog")]
    UnknownModule(ModuleId),
    #[error("module {0} has no quiz")]
    NoQuiz(ModuleId),
    #[error("score must be between 0 and 100, got {0}")]
    InvalidScore(u8),
    #[error("score {supplied} does not match the submitted answers, which score {computed}")]
    ScoreMismatch { supplied: u8, computed: u8 },
    #[error("passed must be {expected} for score {score} against passing score {passing_score}")]
    PassedMismatch {
        score: u8,
        passing_score: u8,
        expected: bool,
    },
    #[error("{} question(s) left unanswered", missing.len())]
    Incomplete { missing: Vec<QuestionId> },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BookmarkService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookmarkServiceError {
    #[error("module {0} is not in the catalog")]
    UnknownModule(ModuleId),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("user {0} does not exist")]
    UnknownUser(UserId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
