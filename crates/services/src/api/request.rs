//! Wire requests and their field-level validation.
//!
//! Payload fields are all optional on the wire so that a missing or
//! out-of-range value is reported against its field name instead of as a
//! parse failure.

use serde::Deserialize;

use course_core::model::{Answers, BookmarkId, ModuleId, UserId};

use super::calculators::{
    HaccpPayload, ReplayPayload, RiskPayload, RpnPayload, ThcPayload, WorksheetPayload,
};
use super::error::{ApiError, FieldError};

/// One call into [`CourseApi`](super::CourseApi), tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    GetProgress(UserScope),
    PostProgress(ProgressPayload),
    GetQuizAttempts(AttemptQuery),
    PostQuizAttempt(AttemptPayload),
    SubmitQuiz(SubmitPayload),
    GetBookmarks(UserScope),
    PostBookmark(BookmarkPayload),
    DeleteBookmark(DeleteBookmarkPayload),
    ResetProgress(UserScope),
    GetCourseSummary(UserScope),
    GetCertificate(UserScope),
    GetCatalog,
    CalculateThc(ThcPayload),
    CalculateRpn(RpnPayload),
    ClassifyRisk(RiskPayload),
    FmeaWorksheet(WorksheetPayload),
    WalkHaccp(HaccpPayload),
    ReplayHaccp(ReplayPayload),
    GetRiskScenarios,
    GetHaccpExamples,
}

impl Request {
    /// Operation name used in failure messages ("Failed to ...").
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Request::GetProgress(_) => "fetch progress",
            Request::PostProgress(_) => "update progress",
            Request::GetQuizAttempts(_) => "fetch quiz attempts",
            Request::PostQuizAttempt(_) | Request::SubmitQuiz(_) => "submit quiz",
            Request::GetBookmarks(_) => "fetch bookmarks",
            Request::PostBookmark(_) => "create bookmark",
            Request::DeleteBookmark(_) => "delete bookmark",
            Request::ResetProgress(_) => "reset progress",
            Request::GetCourseSummary(_) => "fetch course summary",
            Request::GetCertificate(_) => "issue certificate",
            Request::GetCatalog => "fetch catalog",
            Request::CalculateThc(_) => "calculate total THC",
            Request::CalculateRpn(_) => "calculate RPN",
            Request::ClassifyRisk(_) => "classify risk",
            Request::FmeaWorksheet(_) => "rank FMEA worksheet",
            Request::WalkHaccp(_) => "walk HACCP decision tree",
            Request::ReplayHaccp(_) => "replay HACCP path",
            Request::GetRiskScenarios => "fetch risk scenarios",
            Request::GetHaccpExamples => "fetch HACCP examples",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScope {
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub user_id: Option<i64>,
    pub module_id: Option<i64>,
    pub completed: Option<bool>,
    pub quiz_score: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuery {
    pub user_id: Option<i64>,
    pub module_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPayload {
    pub user_id: Option<i64>,
    pub module_id: Option<i64>,
    pub answers: Option<Answers>,
    pub score: Option<i64>,
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub user_id: Option<i64>,
    pub module_id: Option<i64>,
    pub answers: Option<Answers>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    pub user_id: Option<i64>,
    pub module_id: Option<i64>,
    pub section_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBookmarkPayload {
    pub id: Option<i64>,
}

//
// ─── VALIDATED ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCommand {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub completed: bool,
    pub quiz_score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptCommand {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub answers: Answers,
    pub score: u8,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCommand {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkCommand {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub section_id: String,
    pub title: String,
}

/// Collects every field problem before giving up.
#[derive(Debug, Default)]
struct Check {
    errors: Vec<FieldError>,
}

impl Check {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.fail(field, "Required");
        }
        value
    }

    fn positive_id(&mut self, field: &str, value: i64) -> Option<u64> {
        match u64::try_from(value) {
            Ok(id) if id > 0 => Some(id),
            _ => {
                self.fail(field, "must be a positive integer");
                None
            }
        }
    }

    fn user(&mut self, value: Option<i64>, default_user: UserId) -> Option<UserId> {
        match value {
            None => Some(default_user),
            Some(raw) => self.positive_id("userId", raw).map(UserId::new),
        }
    }

    fn module(&mut self, value: Option<i64>) -> Option<ModuleId> {
        let raw = self.required("moduleId", value)?;
        self.positive_id("moduleId", raw).map(ModuleId::new)
    }

    fn percent(&mut self, field: &str, value: i64) -> Option<u8> {
        match u8::try_from(value) {
            Ok(score) if score <= 100 => Some(score),
            _ => {
                self.fail(field, "must be between 0 and 100");
                None
            }
        }
    }

    fn text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let text = self.required(field, value)?;
        if text.trim().is_empty() {
            self.fail(field, "must not be empty");
            return None;
        }
        Some(text)
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }

    fn into_error(self) -> ApiError {
        ApiError::Validation(self.errors)
    }
}

impl UserScope {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a non-positive `userId`.
    pub fn validate(self, default_user: UserId) -> Result<UserId, ApiError> {
        let mut check = Check::default();
        let Some(user_id) = check.user(self.user_id, default_user) else {
            return Err(check.into_error());
        };
        Ok(user_id)
    }
}

impl ProgressPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` listing every missing or invalid field.
    pub fn validate(self, default_user: UserId) -> Result<ProgressCommand, ApiError> {
        let mut check = Check::default();
        let user_id = check.user(self.user_id, default_user);
        let module_id = check.module(self.module_id);
        let completed = check.required("completed", self.completed);
        let quiz_score = self.quiz_score.map(|raw| check.percent("quizScore", raw));

        let (Some(user_id), Some(module_id), Some(completed)) = (user_id, module_id, completed)
        else {
            return Err(check.into_error());
        };
        check.finish()?;
        Ok(ProgressCommand {
            user_id,
            module_id,
            completed,
            quiz_score: quiz_score.flatten(),
        })
    }
}

impl AttemptQuery {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for non-positive ids.
    pub fn validate(self, default_user: UserId) -> Result<(UserId, Option<ModuleId>), ApiError> {
        let mut check = Check::default();
        let user_id = check.user(self.user_id, default_user);
        let module_id = self
            .module_id
            .map(|raw| check.positive_id("moduleId", raw).map(ModuleId::new));
        let Some(user_id) = user_id else {
            return Err(check.into_error());
        };
        check.finish()?;
        Ok((user_id, module_id.flatten()))
    }
}

impl AttemptPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` listing every missing or invalid field.
    pub fn validate(self, default_user: UserId) -> Result<AttemptCommand, ApiError> {
        let mut check = Check::default();
        let user_id = check.user(self.user_id, default_user);
        let module_id = check.module(self.module_id);
        let answers = check.required("answers", self.answers);
        let score = check
            .required("score", self.score)
            .and_then(|raw| check.percent("score", raw));
        let passed = check.required("passed", self.passed);

        let (Some(user_id), Some(module_id), Some(answers), Some(score), Some(passed)) =
            (user_id, module_id, answers, score, passed)
        else {
            return Err(check.into_error());
        };
        Ok(AttemptCommand {
            user_id,
            module_id,
            answers,
            score,
            passed,
        })
    }
}

impl SubmitPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` listing every missing or invalid field.
    pub fn validate(self, default_user: UserId) -> Result<SubmitCommand, ApiError> {
        let mut check = Check::default();
        let user_id = check.user(self.user_id, default_user);
        let module_id = check.module(self.module_id);
        let answers = check.required("answers", self.answers);

        let (Some(user_id), Some(module_id), Some(answers)) = (user_id, module_id, answers) else {
            return Err(check.into_error());
        };
        Ok(SubmitCommand {
            user_id,
            module_id,
            answers,
        })
    }
}

impl BookmarkPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` listing every missing or invalid field.
    pub fn validate(self, default_user: UserId) -> Result<BookmarkCommand, ApiError> {
        let mut check = Check::default();
        let user_id = check.user(self.user_id, default_user);
        let module_id = check.module(self.module_id);
        let section_id = check.text("sectionId", self.section_id);
        let title = check.text("title", self.title);

        let (Some(user_id), Some(module_id), Some(section_id), Some(title)) =
            (user_id, module_id, section_id, title)
        else {
            return Err(check.into_error());
        };
        Ok(BookmarkCommand {
            user_id,
            module_id,
            section_id,
            title,
        })
    }
}

impl DeleteBookmarkPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a missing or non-positive id.
    pub fn validate(self) -> Result<BookmarkId, ApiError> {
        let mut check = Check::default();
        let id = check
            .required("id", self.id)
            .and_then(|raw| check.positive_id("id", raw));
        let Some(id) = id else {
            return Err(check.into_error());
        };
        Ok(BookmarkId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_USER: UserId = UserId::new(1);

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn parses_tagged_requests() {
        let request: Request = serde_json::from_str(
            r#"{"op":"postProgress","moduleId":3,"completed":true,"quizScore":80}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::PostProgress(ProgressPayload {
                user_id: None,
                module_id: Some(3),
                completed: Some(true),
                quiz_score: Some(80),
            })
        );
        assert_eq!(request.operation(), "update progress");

        let request: Request = serde_json::from_str(r#"{"op":"getCatalog"}"#).unwrap();
        assert_eq!(request, Request::GetCatalog);
    }

    #[test]
    fn user_defaults_to_configured_learner() {
        assert_eq!(UserScope::default().validate(DEFAULT_USER).unwrap(), DEFAULT_USER);
        let explicit = UserScope { user_id: Some(4) };
        assert_eq!(explicit.validate(DEFAULT_USER).unwrap(), UserId::new(4));
        let negative = UserScope { user_id: Some(-1) };
        assert_eq!(fields(negative.validate(DEFAULT_USER).unwrap_err()), ["userId"]);
    }

    #[test]
    fn progress_reports_every_bad_field() {
        let payload = ProgressPayload {
            user_id: None,
            module_id: None,
            completed: None,
            quiz_score: Some(150),
        };
        assert_eq!(
            fields(payload.validate(DEFAULT_USER).unwrap_err()),
            ["moduleId", "completed", "quizScore"]
        );

        let payload = ProgressPayload {
            module_id: Some(2),
            completed: Some(false),
            quiz_score: Some(-3),
            ..ProgressPayload::default()
        };
        assert_eq!(fields(payload.validate(DEFAULT_USER).unwrap_err()), ["quizScore"]);
    }

    #[test]
    fn null_quiz_score_is_absent() {
        let request: Request = serde_json::from_str(
            r#"{"op":"postProgress","moduleId":1,"completed":false,"quizScore":null}"#,
        )
        .unwrap();
        let Request::PostProgress(payload) = request else {
            panic!("wrong variant");
        };
        let command = payload.validate(DEFAULT_USER).unwrap();
        assert_eq!(command.quiz_score, None);
    }

    #[test]
    fn attempt_requires_score_and_flag() {
        let payload = AttemptPayload {
            module_id: Some(2),
            answers: Some(Answers::new()),
            ..AttemptPayload::default()
        };
        assert_eq!(
            fields(payload.validate(DEFAULT_USER).unwrap_err()),
            ["score", "passed"]
        );
    }

    #[test]
    fn bookmark_text_must_be_present() {
        let payload = BookmarkPayload {
            module_id: Some(1),
            section_id: Some("   ".into()),
            ..BookmarkPayload::default()
        };
        assert_eq!(
            fields(payload.validate(DEFAULT_USER).unwrap_err()),
            ["sectionId", "title"]
        );
    }

    #[test]
    fn delete_needs_positive_id() {
        assert_eq!(
            DeleteBookmarkPayload { id: Some(7) }.validate().unwrap(),
            BookmarkId::new(7)
        );
        assert_eq!(
            fields(DeleteBookmarkPayload { id: Some(0) }.validate().unwrap_err()),
            ["id"]
        );
        assert_eq!(
            fields(DeleteBookmarkPayload { id: None }.validate().unwrap_err()),
            ["id"]
        );
    }
}
