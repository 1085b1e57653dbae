//! Persisted token records and their read projections.

use chrono::{DateTime, Utc};
use serde::Serialize;

use authgate_core::{Entity, TokenId, UserId};

use crate::claims::TokenKind;

/// One issued bearer token as the store sees it.
///
/// Only the digest of the bearer string is kept. Records are deactivated,
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: TokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub kind: TokenKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(
        user_id: UserId,
        token_hash: String,
        kind: TokenKind,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TokenId::new(),
            user_id,
            token_hash,
            kind,
            is_active: true,
            created_at,
            expires_at,
        }
    }

    /// Active and not yet expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            id: self.id,
            kind: self.kind,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl Entity for TokenRecord {
    type Id = TokenId;

    fn id(&self) -> TokenId {
        self.id
    }
}

/// Read-only view returned by `list_active_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub id: TokenId,
    #[serde(rename = "token_type")]
    pub kind: TokenKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Raw bearer strings handed to the caller exactly once, at issuance.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
