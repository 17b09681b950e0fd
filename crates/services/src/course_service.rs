use std::sync::Arc;

use course_core::model::{
    CERTIFICATE_ALPHABET, CERTIFICATE_PREFIX, CERTIFICATE_SUFFIX_LEN, Catalog, Certificate,
    CourseSummary, UserId,
};
use rand::{Rng, rng};
use storage::repository::{ProgressRepository, ResetRepository, ResetReport, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::CourseServiceError;

/// Course-wide views over a learner's progress.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    catalog: Arc<Catalog>,
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
    resets: Arc<dyn ResetRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressRepository>,
        resets: Arc<dyn ResetRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            users,
            progress,
            resets,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Completion counts, percentage and overall score for a learner.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn summary(&self, user_id: UserId) -> Result<CourseSummary, CourseServiceError> {
        let records = self.progress.list_progress(user_id).await?;
        Ok(CourseSummary::compute(&self.catalog, &records))
    }

    /// Certificate for a learner who completed every module, else `None`.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::UnknownUser` if the learner has no
    /// account, and `CourseServiceError::Storage` if repository access fails.
    pub async fn certificate(
        &self,
        user_id: UserId,
    ) -> Result<Option<Certificate>, CourseServiceError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(CourseServiceError::UnknownUser(user_id))?;
        let summary = self.summary(user_id).await?;
        let certificate = Certificate::issue(
            new_certificate_id(&mut rng()),
            user.username,
            &summary,
            self.clock.now(),
        );
        if let Some(issued) = &certificate {
            info!(user_id = %user_id, certificate_id = %issued.certificate_id, "certificate issued");
        }
        Ok(certificate)
    }

    /// Wipe a learner's progress, attempts and bookmarks.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn reset(&self, user_id: UserId) -> Result<ResetReport, CourseServiceError> {
        let report = self.resets.reset_user(user_id).await?;
        info!(
            user_id = %user_id,
            progress = report.progress,
            attempts = report.attempts,
            bookmarks = report.bookmarks,
            "progress reset"
        );
        Ok(report)
    }
}

/// `KO-QA-` plus a random base-36 suffix.
fn new_certificate_id(rng: &mut impl Rng) -> String {
    let suffix: String = (0..CERTIFICATE_SUFFIX_LEN)
        .map(|_| {
            let index = rng.random_range(0..CERTIFICATE_ALPHABET.len());
            char::from(CERTIFICATE_ALPHABET[index])
        })
        .collect();
    format!("{CERTIFICATE_PREFIX}{suffix}")
}
