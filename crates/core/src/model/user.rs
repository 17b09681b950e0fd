use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Username of the learner every deployment starts with.
pub const DEFAULT_USERNAME: &str = "student";

/// A learner account.
///
/// There is no authentication; the password is carried only because the
/// account shape includes it, and it never leaves the process in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

/// Fields needed to register a learner; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

impl NewUser {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The demo learner created alongside every store.
    #[must_use]
    pub fn default_student() -> Self {
        Self::new(DEFAULT_USERNAME, "password")
    }
}
