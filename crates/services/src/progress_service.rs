use std::sync::Arc;

use course_core::model::{Catalog, ModuleId, ProgressRecord, ProgressUpdate, UserId};
use storage::repository::ProgressRepository;
use tracing::debug;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Reads and writes per-module completion state.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<Catalog>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            catalog,
            progress,
        }
    }

    /// All progress records of a learner. Unknown learners get an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let records = self.progress.list_progress(user_id).await?;
        Ok(records)
    }

    /// Insert or overwrite the record for `(user_id, module_id)`.
    ///
    /// A `None` score leaves any stored score in place. `completed_at` moves
    /// to now whenever `completed` is true and is otherwise kept.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownModule` for modules outside the
    /// catalog, `ProgressServiceError::Progress` for a score above 100, and
    /// `ProgressServiceError::Storage` if persistence fails.
    pub async fn update_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        completed: bool,
        quiz_score: Option<u8>,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        if !self.catalog.contains(module_id) {
            return Err(ProgressServiceError::UnknownModule(module_id));
        }
        let update = ProgressUpdate::new(user_id, module_id, completed, quiz_score)?;
        let record = self
            .progress
            .upsert_progress(&update, self.clock.now())
            .await?;
        debug!(
            user_id = %user_id,
            module_id = %module_id,
            completed = record.completed,
            "progress updated"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use course_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service() -> ProgressService {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        ProgressService::new(fixed_clock(), catalog, Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn identical_upserts_are_idempotent() {
        let service = service();
        let user = UserId::new(1);
        let module = ModuleId::new(2);

        let first = service
            .update_progress(user, module, true, Some(90))
            .await
            .unwrap();
        let second = service
            .update_progress(user, module, true, Some(90))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.completed_at, Some(fixed_now()));
        assert_eq!(service.get_progress(user).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn last_payload_wins() {
        let service = service();
        let user = UserId::new(1);
        let module = ModuleId::new(5);
        for (completed, score) in [(false, Some(40)), (true, Some(70)), (true, Some(95))] {
            service
                .update_progress(user, module, completed, score)
                .await
                .unwrap();
        }
        let records = service.get_progress(user).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert_eq!(records[0].quiz_score, Some(95));
    }

    #[tokio::test]
    async fn rejects_unknown_module_and_bad_score() {
        let service = service();
        let user = UserId::new(1);
        assert!(matches!(
            service
                .update_progress(user, ModuleId::new(99), true, None)
                .await,
            Err(ProgressServiceError::UnknownModule(_))
        ));
        assert!(matches!(
            service
                .update_progress(user, ModuleId::new(1), true, Some(101))
                .await,
            Err(ProgressServiceError::Progress(_))
        ));
        assert!(service.get_progress(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_has_no_progress() {
        let service = service();
        assert!(service.get_progress(UserId::new(77)).await.unwrap().is_empty());
    }
}
