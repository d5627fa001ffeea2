//! Mock Token Repository
//!
//! In-memory repository with failure injection and call history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{AccessTokenRepository, InMemoryAccessTokenRepository, Revocation};
use crate::error::{StorageError, TokenStoreError};
use crate::types::{AccessToken, AccessTokenId, ApplicationId, NewAccessToken, ResourceOwnerId};

/// Mock access token repository for testing.
#[derive(Default)]
pub struct MockAccessTokenRepository {
    inner: InMemoryAccessTokenRepository,
    insert_history: Mutex<Vec<NewAccessToken>>,
    revoke_history: Mutex<Vec<AccessTokenId>>,
    lookup_count: Mutex<usize>,
    insert_errors: Mutex<VecDeque<StorageError>>,
    next_error: Mutex<Option<StorageError>>,
    should_fail: Mutex<bool>,
}

impl MockAccessTokenRepository {
    /// Create new mock repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set next error to return from any operation.
    pub fn set_next_error(&self, error: StorageError) -> &Self {
        *self.next_error.lock() = Some(error);
        self
    }

    /// Queue an error for the next `insert` call only.
    pub fn push_insert_error(&self, error: StorageError) -> &Self {
        self.insert_errors.lock().push_back(error);
        self
    }

    /// Set repository to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock() = should_fail;
        self
    }

    /// Payloads passed to `insert`, failed attempts included.
    pub fn get_insert_history(&self) -> Vec<NewAccessToken> {
        self.insert_history.lock().clone()
    }

    /// Token ids passed to `revoke`.
    pub fn get_revoke_history(&self) -> Vec<AccessTokenId> {
        self.revoke_history.lock().clone()
    }

    /// Number of read operations served.
    pub fn lookup_count(&self) -> usize {
        *self.lookup_count.lock()
    }

    /// Underlying storage.
    pub fn inner(&self) -> &InMemoryAccessTokenRepository {
        &self.inner
    }

    fn check_error(&self) -> Result<(), TokenStoreError> {
        if *self.should_fail.lock() {
            return Err(StorageError::ConnectionFailed {
                message: "Mock storage failure".to_string(),
            }
            .into());
        }

        if let Some(error) = self.next_error.lock().take() {
            return Err(error.into());
        }

        Ok(())
    }

    fn record_lookup(&self) {
        *self.lookup_count.lock() += 1;
    }
}

#[async_trait]
impl AccessTokenRepository for MockAccessTokenRepository {
    async fn insert(&self, token: NewAccessToken) -> Result<AccessToken, TokenStoreError> {
        self.check_error()?;
        self.insert_history.lock().push(token.clone());

        if let Some(error) = self.insert_errors.lock().pop_front() {
            return Err(error.into());
        }

        self.inner.insert(token).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>, TokenStoreError> {
        self.check_error()?;
        self.record_lookup();
        self.inner.find_by_token(token).await
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, TokenStoreError> {
        self.check_error()?;
        self.record_lookup();
        self.inner.find_by_refresh_token(refresh_token).await
    }

    async fn last_active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Option<AccessToken>, TokenStoreError> {
        self.check_error()?;
        self.record_lookup();
        self.inner
            .last_active_for(application_id, resource_owner_id)
            .await
    }

    async fn active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Vec<AccessToken>, TokenStoreError> {
        self.check_error()?;
        self.record_lookup();
        self.inner.active_for(application_id, resource_owner_id).await
    }

    async fn revoke(
        &self,
        id: AccessTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Revocation>, TokenStoreError> {
        self.check_error()?;
        self.revoke_history.lock().push(id);
        self.inner.revoke(id, revoked_at).await
    }
}

/// Create mock access token repository for testing.
pub fn create_mock_repository() -> MockAccessTokenRepository {
    MockAccessTokenRepository::new()
}
