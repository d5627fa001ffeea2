//! Token Storage
//!
//! Repository abstraction over persisted access tokens.
//!
//! This module provides:
//!
//! - **AccessTokenRepository**: the storage contract used by the store
//! - **InMemoryAccessTokenRepository**: process-local implementation with
//!   unique indexes on `token` and `refresh_token`
//! - **MockAccessTokenRepository**: failure injection and call history for tests

pub mod memory;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TokenStoreError;
use crate::types::{AccessToken, AccessTokenId, ApplicationId, NewAccessToken, ResourceOwnerId};

pub use memory::{create_in_memory_repository, InMemoryAccessTokenRepository};
pub use mock::{create_mock_repository, MockAccessTokenRepository};

/// Result of a conditional revoke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revocation {
    /// Row after the update.
    pub token: AccessToken,
    /// Whether this call set `revoked_at`. False when the token was already
    /// revoked.
    pub newly_revoked: bool,
}

/// Access token repository interface.
///
/// Implementations must enforce uniqueness of `token` and `refresh_token`
/// themselves (a database unique index, or a check-and-insert under one
/// lock) and report a collision as `StorageError::UniqueViolation` naming
/// the column. Filters on `application_id` / `resource_owner_id` treat
/// `None` as `IS NULL`.
#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    /// Persist a new token and return it with its assigned id.
    async fn insert(&self, token: NewAccessToken) -> Result<AccessToken, TokenStoreError>;

    /// Find by exact token value.
    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>, TokenStoreError>;

    /// Find by exact refresh token value.
    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, TokenStoreError>;

    /// Newest unrevoked token for the pair, ordered by `created_at` then `id`.
    async fn last_active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Option<AccessToken>, TokenStoreError>;

    /// All unrevoked tokens for the pair, newest first.
    async fn active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Vec<AccessToken>, TokenStoreError>;

    /// Set `revoked_at` if it is not set yet, atomically.
    ///
    /// Returns the row after the update, or `None` if no such token exists.
    /// An already revoked token keeps its original timestamp. Stored
    /// timestamps may be truncated, so callers rely on `newly_revoked`
    /// rather than comparing `revoked_at`.
    async fn revoke(
        &self,
        id: AccessTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Revocation>, TokenStoreError>;
}
