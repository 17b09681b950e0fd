use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, ProgressId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("quiz score must be between 0 and 100, got {0}")]
    InvalidQuizScore(u8),
}

//
// ─── UPDATE ────────────────────────────────────────────────────────────────────
//

/// Payload of a progress write for one `(user, module)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    user_id: UserId,
    module_id: ModuleId,
    completed: bool,
    quiz_score: Option<u8>,
}

impl ProgressUpdate {
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidQuizScore` if the score exceeds 100.
    pub fn new(
        user_id: UserId,
        module_id: ModuleId,
        completed: bool,
        quiz_score: Option<u8>,
    ) -> Result<Self, ProgressError> {
        if let Some(score) = quiz_score.filter(|score| *score > 100) {
            return Err(ProgressError::InvalidQuizScore(score));
        }
        Ok(Self {
            user_id,
            module_id,
            completed,
            quiz_score,
        })
    }

    /// Mark a module complete after a passed quiz.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidQuizScore` if the score exceeds 100.
    pub fn passed_quiz(
        user_id: UserId,
        module_id: ModuleId,
        score: u8,
    ) -> Result<Self, ProgressError> {
        Self::new(user_id, module_id, true, Some(score))
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn quiz_score(&self) -> Option<u8> {
        self.quiz_score
    }

    /// Store key; at most one record exists per key.
    #[must_use]
    pub fn key(&self) -> (UserId, ModuleId) {
        (self.user_id, self.module_id)
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Completion state of one module for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: ProgressId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub completed: bool,
    pub quiz_score: Option<u8>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// First write for a `(user, module)` pair.
    #[must_use]
    pub fn create(id: ProgressId, update: &ProgressUpdate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: update.user_id,
            module_id: update.module_id,
            completed: update.completed,
            quiz_score: update.quiz_score,
            completed_at: update.completed.then_some(now),
        }
    }

    /// Merge a later write into this record.
    ///
    /// `completed` always takes the new value. A score in the update replaces
    /// the stored one; an update without a score keeps it. `completed_at` is
    /// refreshed on every completing write and never cleared.
    pub fn apply(&mut self, update: &ProgressUpdate, now: DateTime<Utc>) {
        debug_assert_eq!(self.key(), update.key());
        self.completed = update.completed;
        if update.quiz_score.is_some() {
            self.quiz_score = update.quiz_score;
        }
        if update.completed {
            self.completed_at = Some(now);
        }
    }

    #[must_use]
    pub fn key(&self) -> (UserId, ModuleId) {
        (self.user_id, self.module_id)
    }
}
