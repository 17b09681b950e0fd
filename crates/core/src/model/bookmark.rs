use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BookmarkId, ModuleId, UserId};

/// A saved reference to a module section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: BookmarkId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub section_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
