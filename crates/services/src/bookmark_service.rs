use std::sync::Arc;

use course_core::model::{Bookmark, BookmarkId, Catalog, ModuleId, UserId};
use storage::repository::{BookmarkRepository, NewBookmark};
use tracing::{debug, info};

use crate::Clock;
use crate::error::BookmarkServiceError;

/// Saved places inside the course.
#[derive(Clone)]
pub struct BookmarkService {
    clock: Clock,
    catalog: Arc<Catalog>,
    bookmarks: Arc<dyn BookmarkRepository>,
}

impl BookmarkService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<Catalog>, bookmarks: Arc<dyn BookmarkRepository>) -> Self {
        Self {
            clock,
            catalog,
            bookmarks,
        }
    }

    /// Save a bookmark. Repeats are stored as separate rows.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkServiceError::UnknownModule` or
    /// `BookmarkServiceError::EmptyField` for invalid input, and
    /// `BookmarkServiceError::Storage` if persistence fails.
    pub async fn create_bookmark(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        section_id: String,
        title: String,
    ) -> Result<Bookmark, BookmarkServiceError> {
        if !self.catalog.contains(module_id) {
            return Err(BookmarkServiceError::UnknownModule(module_id));
        }
        if section_id.trim().is_empty() {
            return Err(BookmarkServiceError::EmptyField("sectionId"));
        }
        if title.trim().is_empty() {
            return Err(BookmarkServiceError::EmptyField("title"));
        }

        let bookmark = self
            .bookmarks
            .insert_bookmark(NewBookmark {
                user_id,
                module_id,
                section_id,
                title,
                created_at: self.clock.now(),
            })
            .await?;
        debug!(user_id = %user_id, bookmark_id = %bookmark.id, "bookmark created");
        Ok(bookmark)
    }

    /// # Errors
    ///
    /// Returns `BookmarkServiceError::Storage` if repository access fails.
    pub async fn list_bookmarks(&self, user_id: UserId) -> Result<Vec<Bookmark>, BookmarkServiceError> {
        let bookmarks = self.bookmarks.list_bookmarks(user_id).await?;
        Ok(bookmarks)
    }

    /// Delete by id regardless of owner. Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkServiceError::Storage` if repository access fails.
    pub async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), BookmarkServiceError> {
        if self.bookmarks.delete_bookmark(id).await? {
            info!(bookmark_id = %id, "bookmark deleted");
        } else {
            debug!(bookmark_id = %id, "no bookmark to delete");
        }
        Ok(())
    }
}
