use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Answers, AttemptId, Bookmark, BookmarkId, ModuleId, NewUser, ProgressId, ProgressRecord,
    ProgressUpdate, QuizAttempt, User, UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A quiz submission that has been scored but not yet stored.
///
/// The score is fixed here, before the attempt exists, so a stored attempt can
/// never disagree with the answers it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizAttempt {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub answers: Answers,
    pub score: u8,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub section_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Row counts removed by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub progress: usize,
    pub attempts: usize,
    pub bookmarks: usize,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a learner with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
}

/// Per-learner, per-module completion records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All records for a learner, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert or merge the record for `update.key()`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError>;
}

/// Append-only log of quiz submissions.
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn append_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StorageError>;

    /// Attempts by a learner, oldest first, optionally for one module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_attempts(
        &self,
        user_id: UserId,
        module_id: Option<ModuleId>,
    ) -> Result<Vec<QuizAttempt>, StorageError>;
}

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn insert_bookmark(&self, bookmark: NewBookmark) -> Result<Bookmark, StorageError>;

    /// Bookmarks of a learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_bookmarks(&self, user_id: UserId) -> Result<Vec<Bookmark>, StorageError>;

    /// Remove a bookmark by id whoever owns it. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn delete_bookmark(&self, id: BookmarkId) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait ResetRepository: Send + Sync {
    /// Delete every progress record, attempt and bookmark of one learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn reset_user(&self, user_id: UserId) -> Result<ResetReport, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Rows plus the next id to hand out, like a `serial` column.
#[derive(Debug)]
struct Table<R> {
    rows: R,
    next_id: u64,
}

impl<R: Default> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: R::default(),
            next_id: 1,
        }
    }
}

impl<R> Table<R> {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

type UserTable = Table<BTreeMap<UserId, User>>;
type ProgressTable = Table<HashMap<(UserId, ModuleId), ProgressRecord>>;
type AttemptTable = Table<BTreeMap<AttemptId, QuizAttempt>>;
type BookmarkTable = Table<BTreeMap<BookmarkId, Bookmark>>;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// Volatile repository; everything is lost when the process exits.
///
/// Each table sits behind its own mutex, so a read-modify-write on one key is
/// serialized and concurrent upserts resolve last-writer-wins.
#[derive(Clone)]
pub struct InMemoryRepository {
    users: Arc<Mutex<UserTable>>,
    progress: Arc<Mutex<ProgressTable>>,
    attempts: Arc<Mutex<AttemptTable>>,
    bookmarks: Arc<Mutex<BookmarkTable>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Empty store seeded with the default learner (id 1).
    #[must_use]
    pub fn new() -> Self {
        let mut users = UserTable::default();
        let student = NewUser::default_student();
        let id = UserId::new(users.allocate_id());
        users.rows.insert(
            id,
            User {
                id,
                username: student.username,
                password: student.password,
            },
        );

        Self {
            users: Arc::new(Mutex::new(users)),
            progress: Arc::new(Mutex::new(ProgressTable::default())),
            attempts: Arc::new(Mutex::new(AttemptTable::default())),
            bookmarks: Arc::new(Mutex::new(BookmarkTable::default())),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut table = lock(&self.users)?;
        if table.rows.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(table.allocate_id());
        let created = User {
            id,
            username: user.username,
            password: user.password,
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let table = lock(&self.users)?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let table = lock(&self.users)?;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let table = lock(&self.progress)?;
        Ok(table
            .rows
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let mut table = lock(&self.progress)?;
        if let Some(existing) = table.rows.get_mut(&update.key()) {
            existing.apply(update, now);
            return Ok(existing.clone());
        }
        let id = ProgressId::new(table.allocate_id());
        let record = ProgressRecord::create(id, update, now);
        table.rows.insert(update.key(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StorageError> {
        let mut table = lock(&self.attempts)?;
        let id = AttemptId::new(table.allocate_id());
        let stored = QuizAttempt {
            id,
            user_id: attempt.user_id,
            module_id: attempt.module_id,
            answers: attempt.answers,
            score: attempt.score,
            passed: attempt.passed,
            attempted_at: attempt.attempted_at,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        module_id: Option<ModuleId>,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let table = lock(&self.attempts)?;
        Ok(table
            .rows
            .values()
            .filter(|a| a.user_id == user_id)
            .filter(|a| module_id.is_none_or(|m| a.module_id == m))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn insert_bookmark(&self, bookmark: NewBookmark) -> Result<Bookmark, StorageError> {
        let mut table = lock(&self.bookmarks)?;
        let id = BookmarkId::new(table.allocate_id());
        let stored = Bookmark {
            id,
            user_id: bookmark.user_id,
            module_id: bookmark.module_id,
            section_id: bookmark.section_id,
            title: bookmark.title,
            created_at: bookmark.created_at,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_bookmarks(&self, user_id: UserId) -> Result<Vec<Bookmark>, StorageError> {
        let table = lock(&self.bookmarks)?;
        Ok(table
            .rows
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_bookmark(&self, id: BookmarkId) -> Result<bool, StorageError> {
        let mut table = lock(&self.bookmarks)?;
        Ok(table.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl ResetRepository for InMemoryRepository {
    async fn reset_user(&self, user_id: UserId) -> Result<ResetReport, StorageError> {
        // Fixed lock order: progress, attempts, bookmarks.
        let mut progress = lock(&self.progress)?;
        let mut attempts = lock(&self.attempts)?;
        let mut bookmarks = lock(&self.bookmarks)?;

        let mut report = ResetReport::default();

        let before = progress.rows.len();
        progress.rows.retain(|(owner, _), _| *owner != user_id);
        report.progress = before - progress.rows.len();

        let before = attempts.rows.len();
        attempts.rows.retain(|_, a| a.user_id != user_id);
        report.attempts = before - attempts.rows.len();

        let before = bookmarks.rows.len();
        bookmarks.rows.retain(|_, b| b.user_id != user_id);
        report.bookmarks = before - bookmarks.rows.len();

        Ok(report)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub resets: Arc<dyn ResetRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn QuizAttemptRepository> = Arc::new(repo.clone());
        let bookmarks: Arc<dyn BookmarkRepository> = Arc::new(repo.clone());
        let resets: Arc<dyn ResetRepository> = Arc::new(repo);
        Self {
            users,
            progress,
            attempts,
            bookmarks,
            resets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{OptionId, QuestionId};
    use course_core::time::fixed_now;

    fn update(user: u64, module: u64, completed: bool, score: Option<u8>) -> ProgressUpdate {
        ProgressUpdate::new(UserId::new(user), ModuleId::new(module), completed, score).unwrap()
    }

    fn attempt(user: u64, module: u64, score: u8) -> NewQuizAttempt {
        let mut answers = Answers::new();
        answers.insert(QuestionId::new("q1"), OptionId::new("a"));
        NewQuizAttempt {
            user_id: UserId::new(user),
            module_id: ModuleId::new(module),
            answers,
            score,
            passed: score >= 75,
            attempted_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn default_student_exists() {
        let repo = InMemoryRepository::new();
        let user = repo.get_user(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(user.username, "student");
        let by_name = repo.get_user_by_username("student").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryRepository::new();
        let second = repo.create_user(NewUser::new("auditor", "pw")).await.unwrap();
        assert_eq!(second.id, UserId::new(2));
        let err = repo.create_user(NewUser::new("auditor", "pw")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn upsert_keeps_one_record_per_key() {
        let repo = InMemoryRepository::new();
        let first = repo.upsert_progress(&update(1, 2, false, None), fixed_now()).await.unwrap();
        let second = repo
            .upsert_progress(&update(1, 2, true, Some(90)), fixed_now())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let records = repo.list_progress(UserId::new(1)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quiz_score, Some(90));
        assert!(records[0].completed);
    }

    #[tokio::test]
    async fn attempts_filter_by_module() {
        let repo = InMemoryRepository::new();
        repo.append_attempt(attempt(1, 2, 80)).await.unwrap();
        repo.append_attempt(attempt(1, 3, 50)).await.unwrap();
        repo.append_attempt(attempt(2, 2, 100)).await.unwrap();

        let all = repo.list_attempts(UserId::new(1), None).await.unwrap();
        assert_eq!(all.len(), 2);
        let module_two = repo
            .list_attempts(UserId::new(1), Some(ModuleId::new(2)))
            .await
            .unwrap();
        assert_eq!(module_two.len(), 1);
        assert_eq!(module_two[0].score, 80);
    }

    #[tokio::test]
    async fn delete_unknown_bookmark_is_noop() {
        let repo = InMemoryRepository::new();
        assert!(!repo.delete_bookmark(BookmarkId::new(42)).await.unwrap());
    }

    #[tokio::test]
    async fn reset_reports_removed_rows() {
        let repo = InMemoryRepository::new();
        repo.upsert_progress(&update(1, 1, true, None), fixed_now()).await.unwrap();
        repo.append_attempt(attempt(1, 2, 40)).await.unwrap();
        repo.append_attempt(attempt(1, 2, 90)).await.unwrap();

        let report = repo.reset_user(UserId::new(1)).await.unwrap();
        assert_eq!(
            report,
            ResetReport {
                progress: 1,
                attempts: 2,
                bookmarks: 0
            }
        );
        // the learner account itself survives
        assert!(repo.get_user(UserId::new(1)).await.unwrap().is_some());
    }
}
