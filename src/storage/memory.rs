//! In-Memory Token Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::{AccessTokenRepository, Revocation};
use crate::error::{StorageError, TokenStoreError};
use crate::types::{AccessToken, AccessTokenId, ApplicationId, NewAccessToken, ResourceOwnerId};

#[derive(Default)]
struct Tables {
    tokens: BTreeMap<AccessTokenId, AccessToken>,
    by_token: HashMap<String, AccessTokenId>,
    by_refresh_token: HashMap<String, AccessTokenId>,
    next_id: AccessTokenId,
}

impl Tables {
    fn active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Vec<&AccessToken> {
        let mut matching: Vec<&AccessToken> = self
            .tokens
            .values()
            .filter(|t| {
                t.application_id == application_id
                    && t.resource_owner_id == resource_owner_id
                    && t.revoked_at.is_none()
            })
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching
    }
}

/// In-memory access token repository.
///
/// Inserts check both unique indexes and write under a single lock, so
/// concurrent issuers can never persist duplicate credentials.
#[derive(Default)]
pub struct InMemoryAccessTokenRepository {
    tables: RwLock<Tables>,
}

impl InMemoryAccessTokenRepository {
    /// Create new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, revoked included.
    pub fn len(&self) -> usize {
        self.tables.read().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored tokens ordered by id.
    pub fn all(&self) -> Vec<AccessToken> {
        self.tables.read().tokens.values().cloned().collect()
    }
}

#[async_trait]
impl AccessTokenRepository for InMemoryAccessTokenRepository {
    async fn insert(&self, token: NewAccessToken) -> Result<AccessToken, TokenStoreError> {
        let mut tables = self.tables.write();

        if tables.by_token.contains_key(&token.token) {
            return Err(StorageError::UniqueViolation {
                field: "token".to_string(),
            }
            .into());
        }

        if let Some(refresh_token) = &token.refresh_token {
            if tables.by_refresh_token.contains_key(refresh_token) {
                return Err(StorageError::UniqueViolation {
                    field: "refresh_token".to_string(),
                }
                .into());
            }
        }

        tables.next_id += 1;
        let id = tables.next_id;
        let stored = AccessToken::from_new(id, token);

        tables.by_token.insert(stored.token.clone(), id);
        if let Some(refresh_token) = &stored.refresh_token {
            tables.by_refresh_token.insert(refresh_token.clone(), id);
        }
        tables.tokens.insert(id, stored.clone());

        Ok(stored)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>, TokenStoreError> {
        let tables = self.tables.read();
        Ok(tables
            .by_token
            .get(token)
            .and_then(|id| tables.tokens.get(id))
            .cloned())
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, TokenStoreError> {
        let tables = self.tables.read();
        Ok(tables
            .by_refresh_token
            .get(refresh_token)
            .and_then(|id| tables.tokens.get(id))
            .cloned())
    }

    async fn last_active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Option<AccessToken>, TokenStoreError> {
        let tables = self.tables.read();
        Ok(tables
            .active_for(application_id, resource_owner_id)
            .into_iter()
            .next()
            .cloned())
    }

    async fn active_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> Result<Vec<AccessToken>, TokenStoreError> {
        let tables = self.tables.read();
        Ok(tables
            .active_for(application_id, resource_owner_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn revoke(
        &self,
        id: AccessTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Revocation>, TokenStoreError> {
        let mut tables = self.tables.write();
        Ok(tables.tokens.get_mut(&id).map(|token| {
            let newly_revoked = token.revoked_at.is_none();
            if newly_revoked {
                token.revoked_at = Some(revoked_at);
            }
            Revocation {
                token: token.clone(),
                newly_revoked,
            }
        }))
    }
}

/// Create in-memory access token repository.
pub fn create_in_memory_repository() -> InMemoryAccessTokenRepository {
    InMemoryAccessTokenRepository::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scopes;
    use chrono::Duration;

    fn new_token(value: &str, refresh: Option<&str>, created_at: DateTime<Utc>) -> NewAccessToken {
        NewAccessToken {
            application_id: Some(1),
            resource_owner_id: Some(2),
            token: value.to_string(),
            refresh_token: refresh.map(String::from),
            previous_refresh_token: None,
            scopes: Scopes::from_string("read"),
            expires_in: Some(3600),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryAccessTokenRepository::new();
        let stored = repo
            .insert(new_token("abc", Some("refresh-abc"), Utc::now()))
            .await
            .unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(repo.find_by_token("abc").await.unwrap(), Some(stored.clone()));
        assert_eq!(
            repo.find_by_refresh_token("refresh-abc").await.unwrap(),
            Some(stored)
        );
        assert!(repo.find_by_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_token_enforced() {
        let repo = InMemoryAccessTokenRepository::new();
        repo.insert(new_token("abc", None, Utc::now())).await.unwrap();

        let err = repo
            .insert(new_token("abc", None, Utc::now()))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation("token"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_refresh_token_enforced() {
        let repo = InMemoryAccessTokenRepository::new();
        repo.insert(new_token("a", Some("r"), Utc::now()))
            .await
            .unwrap();

        let err = repo
            .insert(new_token("b", Some("r"), Utc::now()))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation("refresh_token"));
        assert!(repo.find_by_token("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_active_ordering_with_tie() {
        let repo = InMemoryAccessTokenRepository::new();
        let now = Utc::now();

        repo.insert(new_token("old", None, now - Duration::minutes(5)))
            .await
            .unwrap();
        repo.insert(new_token("tie-1", None, now)).await.unwrap();
        repo.insert(new_token("tie-2", None, now)).await.unwrap();

        let last = repo.last_active_for(Some(1), Some(2)).await.unwrap().unwrap();
        assert_eq!(last.token, "tie-2");

        let active = repo.active_for(Some(1), Some(2)).await.unwrap();
        let values: Vec<&str> = active.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(values, vec!["tie-2", "tie-1", "old"]);
    }

    #[tokio::test]
    async fn test_revoke_is_monotonic() {
        let repo = InMemoryAccessTokenRepository::new();
        let stored = repo.insert(new_token("abc", None, Utc::now())).await.unwrap();

        let first = Utc::now();
        let revoked = repo.revoke(stored.id, first).await.unwrap().unwrap();
        assert!(revoked.newly_revoked);
        assert_eq!(revoked.token.revoked_at, Some(first));

        let again = repo
            .revoke(stored.id, first + Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert!(!again.newly_revoked);
        assert_eq!(again.token.revoked_at, Some(first));

        assert!(repo.last_active_for(Some(1), Some(2)).await.unwrap().is_none());
        assert!(repo.revoke(999, first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_filters_match_null_columns() {
        let repo = InMemoryAccessTokenRepository::new();
        let mut token = new_token("client-only", None, Utc::now());
        token.resource_owner_id = None;
        repo.insert(token).await.unwrap();

        assert!(repo.last_active_for(Some(1), None).await.unwrap().is_some());
        assert!(repo.last_active_for(Some(1), Some(2)).await.unwrap().is_none());
    }
}
