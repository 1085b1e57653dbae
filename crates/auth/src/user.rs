//! User identity record.

use chrono::{DateTime, NaiveDate, Utc};

use authgate_core::{Entity, UserId};

/// A registered account.
///
/// # Invariants
/// - `username` is unique case-insensitively; `email` is unique exactly.
/// - `password_hash` is a PHC string; the plaintext is never held here.
/// - Users are never hard-deleted; `is_active = false` is the only destructive state.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub birthday: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        birthday: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            password_hash,
            birthday,
            created_at,
            is_active: true,
        }
    }

    /// Key used for case-insensitive username comparison.
    pub fn username_key(username: &str) -> String {
        username.to_lowercase()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("birthday", &self.birthday)
            .field("created_at", &self.created_at)
            .field("is_active", &self.is_active)
            .finish()
    }
}
