use std::sync::Arc;

use course_core::model::{
    Answers, Catalog, ModuleId, ProgressUpdate, Quiz, QuizAttempt, UserId,
};
use course_core::scoring::{self, QuizScore};
use serde::Serialize;
use storage::repository::{NewQuizAttempt, ProgressRepository, QuizAttemptRepository};
use tracing::{error, info};

use crate::Clock;
use crate::error::QuizServiceError;

/// A stored attempt plus the breakdown it was scored from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredAttempt {
    pub attempt: QuizAttempt,
    pub result: QuizScore,
}

/// Records quiz attempts and marks modules complete on a pass.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    catalog: Arc<Catalog>,
    attempts: Arc<dyn QuizAttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        attempts: Arc<dyn QuizAttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            attempts,
            progress,
        }
    }

    /// Append a client-scored attempt.
    ///
    /// The supplied `score` is re-checked against `answers` and `passed`
    /// against the module's passing score before anything is stored. A passed
    /// attempt also marks the module complete with this score; the attempt is
    /// kept even if that progress write fails.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::UnknownModule` or `QuizServiceError::NoQuiz`
    /// when the module has nothing to attempt, `QuizServiceError::InvalidScore`,
    /// `QuizServiceError::ScoreMismatch` or `QuizServiceError::PassedMismatch`
    /// for an inconsistent result, and `QuizServiceError::Storage` if the
    /// attempt cannot be stored.
    pub async fn record_attempt(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        answers: Answers,
        score: u8,
        passed: bool,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = self.quiz(module_id)?;
        if score > 100 {
            return Err(QuizServiceError::InvalidScore(score));
        }
        let computed = scoring::score_quiz(quiz, &answers);
        if computed.score != score {
            return Err(QuizServiceError::ScoreMismatch {
                supplied: score,
                computed: computed.score,
            });
        }
        if passed != computed.passed {
            return Err(QuizServiceError::PassedMismatch {
                score,
                passing_score: quiz.passing_score,
                expected: computed.passed,
            });
        }
        self.append(user_id, module_id, answers, score, passed).await
    }

    /// Score `answers` against the catalog quiz, then record the attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Incomplete` listing every unanswered
    /// question, plus the errors of [`QuizService::record_attempt`].
    pub async fn submit(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        answers: Answers,
    ) -> Result<ScoredAttempt, QuizServiceError> {
        let quiz = self.quiz(module_id)?;

        let missing: Vec<_> = scoring::unanswered(quiz, &answers)
            .into_iter()
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(QuizServiceError::Incomplete { missing });
        }

        let result = scoring::score_quiz(quiz, &answers);
        let attempt = self
            .append(user_id, module_id, answers, result.score, result.passed)
            .await?;
        Ok(ScoredAttempt { attempt, result })
    }

    /// Attempts by a learner, oldest first, optionally for one module.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn get_attempts(
        &self,
        user_id: UserId,
        module_id: Option<ModuleId>,
    ) -> Result<Vec<QuizAttempt>, QuizServiceError> {
        let attempts = self.attempts.list_attempts(user_id, module_id).await?;
        Ok(attempts)
    }

    /// Highest score over a learner's attempts at one module.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn best_score(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<u8>, QuizServiceError> {
        let attempts = self.attempts.list_attempts(user_id, Some(module_id)).await?;
        Ok(attempts.iter().map(|a| a.score).max())
    }

    fn quiz(&self, module_id: ModuleId) -> Result<&Quiz, QuizServiceError> {
        let module = self
            .catalog
            .module(module_id)
            .ok_or(QuizServiceError::UnknownModule(module_id))?;
        module.quiz().ok_or(QuizServiceError::NoQuiz(module_id))
    }

    async fn append(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        answers: Answers,
        score: u8,
        passed: bool,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let now = self.clock.now();
        let attempt = self
            .attempts
            .append_attempt(NewQuizAttempt {
                user_id,
                module_id,
                answers,
                score,
                passed,
                attempted_at: now,
            })
            .await?;
        info!(
            user_id = %user_id,
            module_id = %module_id,
            attempt_id = %attempt.id,
            score,
            passed,
            "quiz attempt recorded"
        );

        if attempt.passed {
            self.complete_module(&attempt).await;
        }
        Ok(attempt)
    }

    async fn complete_module(&self, attempt: &QuizAttempt) {
        let update =
            match ProgressUpdate::passed_quiz(attempt.user_id, attempt.module_id, attempt.score) {
                Ok(update) => update,
                Err(err) => {
                    error!(attempt_id = %attempt.id, error = %err, "passed attempt has an invalid score");
                    return;
                }
            };
        if let Err(err) = self
            .progress
            .upsert_progress(&update, attempt.attempted_at)
            .await
        {
            error!(
                attempt_id = %attempt.id,
                user_id = %attempt.user_id,
                module_id = %attempt.module_id,
                error = %err,
                "failed to mark module complete after passed quiz"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use course_core::model::{OptionId, ProgressRecord, QuestionId};
    use course_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::builtin().unwrap())
    }

    fn service(repo: &InMemoryRepository) -> QuizService {
        QuizService::new(
            fixed_clock(),
            catalog(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(question, option)| (QuestionId::new(*question), OptionId::new(*option)))
            .collect()
    }

    // Module 3 has four questions: c, b, c, c.
    fn three_of_four() -> Answers {
        answers(&[("q1", "c"), ("q2", "b"), ("q3", "c"), ("q4", "a")])
    }

    fn correct_answers(catalog: &Catalog, module: ModuleId) -> Answers {
        catalog
            .quiz(module)
            .unwrap()
            .questions
            .iter()
            .map(|q| (q.id.clone(), q.correct_answer.clone()))
            .collect()
    }

    #[tokio::test]
    async fn passing_attempt_completes_module() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new(1);
        let module = ModuleId::new(3);

        let attempt = service
            .record_attempt(user, module, three_of_four(), 75, true)
            .await
            .unwrap();
        assert!(attempt.passed);

        let progress = repo.list_progress(user).await.unwrap();
        assert_eq!(progress.len(), 1);
        assert!(progress[0].completed);
        assert_eq!(progress[0].quiz_score, Some(75));
    }

    #[tokio::test]
    async fn failing_attempt_leaves_progress_alone() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new(1);

        let half = answers(&[("q1", "c"), ("q2", "b")]);
        service
            .record_attempt(user, ModuleId::new(3), half, 50, false)
            .await
            .unwrap();
        assert!(repo.list_progress(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn passed_flag_must_match_score() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let half = answers(&[("q1", "c"), ("q2", "b")]);
        let err = service
            .record_attempt(UserId::new(1), ModuleId::new(3), half, 50, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::PassedMismatch {
                passing_score: 75,
                expected: false,
                ..
            }
        ));
        assert!(repo.list_attempts(UserId::new(1), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claimed_score_must_match_answers() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new(1);
        let wrong = answers(&[("q1", "a"), ("q2", "a"), ("q3", "a"), ("q4", "a")]);

        let err = service
            .record_attempt(user, ModuleId::new(3), wrong, 100, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::ScoreMismatch {
                supplied: 100,
                computed: 0
            }
        ));

        let err = service
            .record_attempt(user, ModuleId::new(3), three_of_four(), 74, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::ScoreMismatch { computed: 75, .. }
        ));

        assert!(repo.list_attempts(user, None).await.unwrap().is_empty());
        assert!(repo.list_progress(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn module_without_quiz_is_rejected() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let err = service
            .record_attempt(UserId::new(1), ModuleId::new(1), Answers::new(), 100, true)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizServiceError::NoQuiz(_)));
    }

    #[tokio::test]
    async fn submit_scores_server_side() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let catalog = catalog();
        let module = ModuleId::new(2);

        let scored = service
            .submit(UserId::new(1), module, correct_answers(&catalog, module))
            .await
            .unwrap();
        assert_eq!(scored.result.score, 100);
        assert!(scored.attempt.passed);
        assert_eq!(scored.result.correct, scored.result.total);
    }

    #[tokio::test]
    async fn submit_lists_unanswered_questions() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let catalog = catalog();
        let module = ModuleId::new(3);

        let mut answers = correct_answers(&catalog, module);
        let first = catalog.quiz(module).unwrap().questions[0].id.clone();
        answers.remove(&first);

        let err = service
            .submit(UserId::new(1), module, answers)
            .await
            .unwrap_err();
        match err {
            QuizServiceError::Incomplete { missing } => assert_eq!(missing, vec![first]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_attempt_is_kept_and_best_score_wins() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new(1);
        let module = ModuleId::new(7);
        // Module 7 has a single question answered "a".
        for (option, score, passed) in [("x", 0, false), ("a", 100, true), ("b", 0, false)] {
            service
                .record_attempt(user, module, answers(&[("q1", option)]), score, passed)
                .await
                .unwrap();
        }
        let attempts = service.get_attempts(user, Some(module)).await.unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(service.best_score(user, module).await.unwrap(), Some(100));
        assert_eq!(
            service.best_score(user, ModuleId::new(8)).await.unwrap(),
            None
        );
    }

    struct FailingProgress;

    #[async_trait]
    impl ProgressRepository for FailingProgress {
        async fn list_progress(&self, _: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn upsert_progress(
            &self,
            _: &ProgressUpdate,
            _: DateTime<Utc>,
        ) -> Result<ProgressRecord, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    #[tokio::test]
    async fn attempt_survives_progress_failure() {
        let repo = InMemoryRepository::new();
        let service = QuizService::new(
            fixed_clock(),
            catalog(),
            Arc::new(repo.clone()),
            Arc::new(FailingProgress),
        );

        let module = ModuleId::new(3);
        let attempt = service
            .record_attempt(
                UserId::new(1),
                module,
                correct_answers(&catalog(), module),
                100,
                true,
            )
            .await
            .unwrap();
        let stored = repo.list_attempts(UserId::new(1), None).await.unwrap();
        assert_eq!(stored, vec![attempt]);
    }
}
