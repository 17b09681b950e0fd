use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::catalog::Catalog;
use crate::model::ids::ModuleId;
use crate::model::progress::ProgressRecord;
use crate::scoring::percentage;
use crate::time::completion_date;

/// Prefix of every issued certificate id.
pub const CERTIFICATE_PREFIX: &str = "KO-QA-";

/// Length of the random part of a certificate id.
pub const CERTIFICATE_SUFFIX_LEN: usize = 9;

/// Characters a certificate id suffix is drawn from.
pub const CERTIFICATE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Per-module completion state, in catalog order, for navigation views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub module_id: ModuleId,
    pub completed: bool,
    pub score: Option<u8>,
}

/// Aggregate course progress for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub total_modules: usize,
    pub completed_count: usize,
    pub progress_percentage: u8,
    pub course_completed: bool,
    /// Rounded mean of the non-zero quiz scores on completed modules.
    pub overall_score: u8,
    pub modules: Vec<ModuleStatus>,
}

impl CourseSummary {
    /// Fold a learner's progress records over the catalog.
    ///
    /// Records for modules the catalog does not know are ignored.
    #[must_use]
    pub fn compute(catalog: &Catalog, records: &[ProgressRecord]) -> Self {
        let modules: Vec<ModuleStatus> = catalog
            .modules()
            .iter()
            .map(|module| {
                let record = records.iter().find(|r| r.module_id == module.id);
                ModuleStatus {
                    module_id: module.id,
                    completed: record.is_some_and(|r| r.completed),
                    score: record.and_then(|r| r.quiz_score),
                }
            })
            .collect();

        let total_modules = modules.len();
        let completed_count = modules.iter().filter(|m| m.completed).count();

        let scores: Vec<usize> = modules
            .iter()
            .filter(|m| m.completed)
            .filter_map(|m| m.score)
            .filter(|score| *score > 0)
            .map(usize::from)
            .collect();
        let overall_score = if scores.is_empty() {
            0
        } else {
            // mean of percentages = percentage(sum, 100 * n)
            percentage(scores.iter().sum(), 100 * scores.len())
        };

        Self {
            total_modules,
            completed_count,
            progress_percentage: percentage(completed_count, total_modules),
            course_completed: total_modules > 0 && completed_count == total_modules,
            overall_score,
            modules,
        }
    }
}

/// Proof of course completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub certificate_id: String,
    pub student_name: String,
    pub completed_at: DateTime<Utc>,
    /// `completed_at` as printed on the certificate.
    pub completion_date: String,
    pub overall_score: u8,
}

impl Certificate {
    /// Issue a certificate, or `None` while any module is still open.
    ///
    /// The id is generated by the caller; see [`is_certificate_id`].
    #[must_use]
    pub fn issue(
        certificate_id: String,
        student_name: impl Into<String>,
        summary: &CourseSummary,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !summary.course_completed {
            return None;
        }
        Some(Self {
            certificate_id,
            student_name: student_name.into(),
            completed_at: now,
            completion_date: completion_date(now),
            overall_score: summary.overall_score,
        })
    }
}

/// `KO-QA-` followed by nine characters from [`CERTIFICATE_ALPHABET`].
#[must_use]
pub fn is_certificate_id(id: &str) -> bool {
    id.strip_prefix(CERTIFICATE_PREFIX).is_some_and(|suffix| {
        suffix.len() == CERTIFICATE_SUFFIX_LEN
            && suffix.bytes().all(|b| CERTIFICATE_ALPHABET.contains(&b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{ProgressId, UserId};
    use crate::time::fixed_now;

    fn record(module: u64, completed: bool, score: Option<u8>) -> ProgressRecord {
        ProgressRecord {
            id: ProgressId::new(module),
            user_id: UserId::new(1),
            module_id: ModuleId::new(module),
            completed,
            quiz_score: score,
            completed_at: completed.then(fixed_now),
        }
    }

    #[test]
    fn empty_progress_summarizes_to_zero() {
        let catalog = Catalog::builtin().unwrap();
        let summary = CourseSummary::compute(&catalog, &[]);
        assert_eq!(summary.total_modules, 14);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.progress_percentage, 0);
        assert_eq!(summary.overall_score, 0);
        assert!(!summary.course_completed);
        assert_eq!(summary.modules.len(), 14);
    }

    #[test]
    fn overall_score_averages_nonzero_completed_scores() {
        let catalog = Catalog::builtin().unwrap();
        let records = vec![
            record(1, true, None),
            record(2, true, Some(80)),
            record(3, true, Some(75)),
            record(4, false, Some(100)),
        ];
        let summary = CourseSummary::compute(&catalog, &records);
        assert_eq!(summary.completed_count, 3);
        // 3 / 14 = 21.4
        assert_eq!(summary.progress_percentage, 21);
        // (80 + 75) / 2 = 77.5 -> 78
        assert_eq!(summary.overall_score, 78);
        assert_eq!(summary.modules[3].score, Some(100));
        assert!(!summary.modules[3].completed);
    }

    #[test]
    fn certificate_only_for_completed_course() {
        let catalog = Catalog::builtin().unwrap();
        let partial = CourseSummary::compute(&catalog, &[record(1, true, None)]);
        assert!(
            Certificate::issue("KO-QA-000000001".into(), "Student", &partial, fixed_now())
                .is_none()
        );

        let all: Vec<_> = (1..=14).map(|m| record(m, true, Some(90))).collect();
        let summary = CourseSummary::compute(&catalog, &all);
        assert!(summary.course_completed);
        assert_eq!(summary.progress_percentage, 100);

        let cert =
            Certificate::issue("KO-QA-7Q2M0ZK1B".into(), "Student", &summary, fixed_now())
                .unwrap();
        assert_eq!(cert.overall_score, 90);
        assert_eq!(cert.certificate_id, "KO-QA-7Q2M0ZK1B");
        assert_eq!(cert.completion_date, "November 14, 2023");
    }

    #[test]
    fn certificate_id_shape() {
        assert!(is_certificate_id("KO-QA-7Q2M0ZK1B"));
        assert!(!is_certificate_id("KO-QA-7q2m0zk1b"));
        assert!(!is_certificate_id("KO-QA-7Q2M0ZK1"));
        assert!(!is_certificate_id("XX-QA-7Q2M0ZK1B"));
    }
}
