//! Transport-agnostic request dispatch.
//!
//! A [`Request`] is validated, routed to the owning service, and answered
//! with a [`Response`] envelope: `{"ok":true,"data":...}` on success,
//! `{"ok":false,"error":"Invalid data","details":[...]}` when the request is
//! at fault, and `{"ok":false,"error":"Failed to <operation>"}` otherwise.

mod calculators;
mod error;
mod request;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use course_core::model::{Catalog, UserId};
use storage::repository::Storage;

use crate::Clock;
use crate::bookmark_service::BookmarkService;
use crate::course_service::CourseService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;

use self::error::IntoApiError;

pub use calculators::{
    HaccpPayload, HaccpReport, ReplayPayload, RiskPayload, RpnPayload, RpnReport, ScenarioReport,
    ThcPayload, ThcReport, WorksheetPayload, WorksheetReport, WorksheetRow,
};
pub use error::{ApiError, FieldError};
pub use request::{
    AttemptCommand, AttemptPayload, AttemptQuery, BookmarkCommand, BookmarkPayload,
    DeleteBookmarkPayload, ProgressCommand, ProgressPayload, Request, SubmitCommand,
    SubmitPayload, UserScope,
};

/// Reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl Response {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn failure(err: ApiError) -> Self {
        let error = Some(err.to_string());
        let details = match err {
            ApiError::Validation(details) => details,
            ApiError::Operation { .. } => Vec::new(),
        };
        Self {
            ok: false,
            data: None,
            error,
            details,
        }
    }
}

impl From<Result<Value, ApiError>> for Response {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

/// Every course operation behind one entry point.
#[derive(Clone)]
pub struct CourseApi {
    default_user: UserId,
    progress: ProgressService,
    quizzes: QuizService,
    bookmarks: BookmarkService,
    course: CourseService,
}

impl CourseApi {
    /// Wire the services over `storage`; requests without a `userId` act on
    /// `default_user`.
    #[must_use]
    pub fn new(storage: &Storage, catalog: Arc<Catalog>, clock: Clock, default_user: UserId) -> Self {
        Self {
            default_user,
            progress: ProgressService::new(
                clock,
                Arc::clone(&catalog),
                Arc::clone(&storage.progress),
            ),
            quizzes: QuizService::new(
                clock,
                Arc::clone(&catalog),
                Arc::clone(&storage.attempts),
                Arc::clone(&storage.progress),
            ),
            bookmarks: BookmarkService::new(
                clock,
                Arc::clone(&catalog),
                Arc::clone(&storage.bookmarks),
            ),
            course: CourseService::new(
                clock,
                catalog,
                Arc::clone(&storage.users),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.resets),
            ),
        }
    }

    #[must_use]
    pub fn default_user(&self) -> UserId {
        self.default_user
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    #[must_use]
    pub fn quizzes(&self) -> &QuizService {
        &self.quizzes
    }

    #[must_use]
    pub fn bookmarks(&self) -> &BookmarkService {
        &self.bookmarks
    }

    #[must_use]
    pub fn course(&self) -> &CourseService {
        &self.course
    }

    /// Parse one JSON request and answer it. Never fails; malformed input
    /// becomes a validation response.
    pub async fn handle_json(&self, input: &str) -> Response {
        let request = match parse_request(input) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "rejected malformed request");
                return Response::failure(err);
            }
        };
        self.handle(request).await.into()
    }

    /// Run one request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` when the request is invalid, before any
    /// state changes, and `ApiError::Operation` when the operation fails.
    pub async fn handle(&self, request: Request) -> Result<Value, ApiError> {
        let operation = request.operation();
        let result = self.dispatch(request).await;
        match &result {
            Ok(_) => debug!(operation, "request handled"),
            Err(ApiError::Validation(details)) => {
                warn!(operation, fields = details.len(), "invalid request");
            }
            Err(ApiError::Operation { source, .. }) => {
                error!(operation, error = %source, "request failed");
            }
        }
        result
    }

    async fn dispatch(&self, request: Request) -> Result<Value, ApiError> {
        let operation = request.operation();
        let default_user = self.default_user;
        match request {
            Request::GetProgress(scope) => {
                let user_id = scope.validate(default_user)?;
                let records = self
                    .progress
                    .get_progress(user_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &records)
            }
            Request::PostProgress(payload) => {
                let command = payload.validate(default_user)?;
                let record = self
                    .progress
                    .update_progress(
                        command.user_id,
                        command.module_id,
                        command.completed,
                        command.quiz_score,
                    )
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &record)
            }
            Request::GetQuizAttempts(query) => {
                let (user_id, module_id) = query.validate(default_user)?;
                let attempts = self
                    .quizzes
                    .get_attempts(user_id, module_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &attempts)
            }
            Request::PostQuizAttempt(payload) => {
                let command = payload.validate(default_user)?;
                let attempt = self
                    .quizzes
                    .record_attempt(
                        command.user_id,
                        command.module_id,
                        command.answers,
                        command.score,
                        command.passed,
                    )
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &attempt)
            }
            Request::SubmitQuiz(payload) => {
                let command = payload.validate(default_user)?;
                let scored = self
                    .quizzes
                    .submit(command.user_id, command.module_id, command.answers)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &scored)
            }
            Request::GetBookmarks(scope) => {
                let user_id = scope.validate(default_user)?;
                let bookmarks = self
                    .bookmarks
                    .list_bookmarks(user_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &bookmarks)
            }
            Request::PostBookmark(payload) => {
                let command = payload.validate(default_user)?;
                let bookmark = self
                    .bookmarks
                    .create_bookmark(
                        command.user_id,
                        command.module_id,
                        command.section_id,
                        command.title,
                    )
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &bookmark)
            }
            Request::DeleteBookmark(payload) => {
                let id = payload.validate()?;
                self.bookmarks
                    .delete_bookmark(id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                Ok(json!({ "success": true }))
            }
            Request::ResetProgress(scope) => {
                let user_id = scope.validate(default_user)?;
                self.course
                    .reset(user_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                Ok(json!({ "success": true }))
            }
            Request::GetCourseSummary(scope) => {
                let user_id = scope.validate(default_user)?;
                let summary = self
                    .course
                    .summary(user_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &summary)
            }
            Request::GetCertificate(scope) => {
                let user_id = scope.validate(default_user)?;
                let certificate = self
                    .course
                    .certificate(user_id)
                    .await
                    .map_err(|e| e.into_api_error(operation))?;
                to_data(operation, &certificate)
            }
            Request::GetCatalog => to_data(operation, self.course.catalog().modules()),
            Request::CalculateThc(payload) => to_data(operation, &payload.calculate()),
            Request::CalculateRpn(payload) => to_data(operation, &payload.calculate()?),
            Request::ClassifyRisk(payload) => to_data(operation, &payload.calculate()?),
            Request::FmeaWorksheet(payload) => to_data(operation, &payload.calculate()?),
            Request::WalkHaccp(payload) => to_data(operation, &payload.calculate()?),
            Request::ReplayHaccp(payload) => to_data(operation, &payload.calculate()?),
            Request::GetRiskScenarios => to_data(operation, &calculators::risk_scenarios()),
            Request::GetHaccpExamples => to_data(operation, calculators::haccp_examples()),
        }
    }
}

fn parse_request(input: &str) -> Result<Request, ApiError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| ApiError::invalid("request", format!("malformed JSON: {e}")))?;
    match value.get("op") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(ApiError::invalid("op", "must be a string")),
        None => return Err(ApiError::invalid("op", "Required")),
    }
    serde_json::from_value(value).map_err(|e| ApiError::invalid("request", e.to_string()))
}

fn to_data<T: Serialize + ?Sized>(operation: &'static str, value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::operation(operation, e))
}
