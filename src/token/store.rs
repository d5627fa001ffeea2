//! Access Token Store
//!
//! Issuance with reuse detection, lookup, revocation and request
//! authorization for access tokens.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{
    DefaultScopeMatcher, GeneratorRegistry, ScopeMatcher, SecureRandomGenerator,
    TokenGenerationContext, TokenGenerator,
};
use crate::error::{StorageError, TokenStoreError, TokenStoreResult, ValidationError};
use crate::storage::AccessTokenRepository;
use crate::types::{
    AccessToken, Application, ApplicationId, Expirable, NewAccessToken, ResourceOwner,
    ResourceOwnerId, ResourceOwnerRef, Scopes, TokenStoreConfig, TOKEN_TYPE,
};

/// Parameters for issuing a new access token.
#[derive(Clone, Default)]
pub struct AccessTokenRequest<'a> {
    pub application: Option<&'a dyn Application>,
    pub resource_owner_id: Option<ResourceOwnerId>,
    pub scopes: Scopes,
    /// Lifetime in seconds. `None` issues a non-expiring token.
    pub expires_in: Option<i64>,
    pub use_refresh_token: bool,
    /// Refresh token this token was exchanged for, if any.
    pub previous_refresh_token: Option<String>,
    /// Issue time. Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

/// Access token store.
///
/// Owns every token mutation for the process. The generator, refresh token
/// generator and scope matcher are fixed when the store is built.
pub struct AccessTokenStore<R: AccessTokenRepository> {
    config: TokenStoreConfig,
    repository: Arc<R>,
    generator: Arc<dyn TokenGenerator>,
    refresh_token_generator: Arc<dyn TokenGenerator>,
    scope_matcher: Arc<dyn ScopeMatcher>,
}

impl<R: AccessTokenRepository> AccessTokenStore<R> {
    /// Create a store using only the built-in generator strategies.
    pub fn new(config: TokenStoreConfig, repository: Arc<R>) -> TokenStoreResult<Self> {
        Self::with_registry(config, repository, &GeneratorRegistry::new())
    }

    /// Create a store resolving custom generator strategies from `registry`.
    pub fn with_registry(
        config: TokenStoreConfig,
        repository: Arc<R>,
        registry: &GeneratorRegistry,
    ) -> TokenStoreResult<Self> {
        config.validate()?;
        let generator = registry.resolve(&config.generator)?;

        info!(
            generator = generator.name(),
            reuse_access_token = config.reuse_access_token,
            max_generation_attempts = config.max_generation_attempts,
            "Access token store initialized"
        );

        Ok(Self {
            config,
            repository,
            generator,
            refresh_token_generator: Arc::new(SecureRandomGenerator::new()),
            scope_matcher: Arc::new(DefaultScopeMatcher::new()),
        })
    }

    /// Replace the scope matcher.
    pub fn with_scope_matcher(mut self, matcher: Arc<dyn ScopeMatcher>) -> Self {
        self.scope_matcher = matcher;
        self
    }

    /// Replace the refresh token generator (random opaque values by default).
    pub fn with_refresh_token_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.refresh_token_generator = generator;
        self
    }

    pub fn config(&self) -> &TokenStoreConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn token_type(&self) -> &'static str {
        TOKEN_TYPE
    }

    /// Find a token by its value.
    pub async fn by_token(&self, token: &str) -> TokenStoreResult<Option<AccessToken>> {
        self.repository.find_by_token(token).await
    }

    /// Find a token by its refresh token.
    pub async fn by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> TokenStoreResult<Option<AccessToken>> {
        self.repository.find_by_refresh_token(refresh_token).await
    }

    /// Most recently created unrevoked token for the pair.
    pub async fn last_authorized_token_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner_id: Option<ResourceOwnerId>,
    ) -> TokenStoreResult<Option<AccessToken>> {
        self.repository
            .last_active_for(application_id, resource_owner_id)
            .await
    }

    /// Last authorized token for the pair, if its scopes satisfy `scopes`
    /// and the application's allowed scopes.
    pub async fn matching_token_for(
        &self,
        application: Option<&dyn Application>,
        resource_owner: impl Into<ResourceOwnerRef<'_>>,
        scopes: &Scopes,
    ) -> TokenStoreResult<Option<AccessToken>> {
        let resource_owner_id = resource_owner.into().id();
        let token = self
            .last_authorized_token_for(application.map(|app| app.id()), resource_owner_id)
            .await?;

        let Some(token) = token else {
            return Ok(None);
        };

        let application_scopes = application.map(|app| app.scopes());
        if self
            .scope_matcher
            .matches(&token.scopes, scopes, application_scopes)
        {
            Ok(Some(token))
        } else {
            debug!(
                token_id = token.id,
                token_scopes = %token.scopes,
                requested_scopes = %scopes,
                "Last authorized token does not match requested scopes"
            );
            Ok(None)
        }
    }

    /// Issuance entry point.
    ///
    /// With reuse enabled, an unexpired token matching the application,
    /// owner and scopes is returned unchanged. Otherwise a new token is
    /// created.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = ?application.map(|app| app.id()),
            resource_owner_id = ?resource_owner_id,
            scopes = %scopes,
        )
    )]
    pub async fn find_or_create_for(
        &self,
        application: Option<&dyn Application>,
        resource_owner_id: Option<ResourceOwnerId>,
        scopes: &Scopes,
        expires_in: Option<i64>,
        use_refresh_token: bool,
    ) -> TokenStoreResult<AccessToken> {
        if self.config.reuse_access_token {
            let matching = self
                .matching_token_for(application, resource_owner_id, scopes)
                .await?;

            if let Some(token) = matching {
                if !token.is_expired() {
                    debug!(token_id = token.id, "Reusing matching access token");
                    return Ok(token);
                }
                debug!(token_id = token.id, "Matching access token expired");
            }
        }

        self.create_for(AccessTokenRequest {
            application,
            resource_owner_id,
            scopes: scopes.clone(),
            expires_in,
            use_refresh_token,
            ..Default::default()
        })
        .await
    }

    /// Always issue a new token.
    ///
    /// Fresh credentials are generated for every attempt. A unique violation
    /// reported by the repository triggers regeneration, up to
    /// `max_generation_attempts` attempts in total.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = ?request.application.map(|app| app.id()),
            resource_owner_id = ?request.resource_owner_id,
        )
    )]
    pub async fn create_for(&self, request: AccessTokenRequest<'_>) -> TokenStoreResult<AccessToken> {
        let created_at = request.created_at.unwrap_or_else(Utc::now);
        validate_expires_in(request.expires_in, created_at)?;
        let mut collided_field = String::from("token");

        for attempt in 1..=self.config.max_generation_attempts {
            let new_token = self.build_token(&request, created_at)?;

            match self.repository.insert(new_token).await {
                Ok(token) => {
                    info!(
                        token_id = token.id,
                        expires_in = ?token.expires_in,
                        refresh_token = token.use_refresh_token(),
                        "Access token issued"
                    );
                    return Ok(token);
                }
                Err(TokenStoreError::Storage(StorageError::UniqueViolation { field })) => {
                    warn!(attempt, field = %field, "Generated credential collided, regenerating");
                    collided_field = field;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ValidationError::NotUnique {
            field: collided_field,
        }
        .into())
    }

    fn build_token(
        &self,
        request: &AccessTokenRequest<'_>,
        created_at: DateTime<Utc>,
    ) -> TokenStoreResult<NewAccessToken> {
        let context = TokenGenerationContext {
            resource_owner_id: request.resource_owner_id,
            scopes: &request.scopes,
            application: request.application,
            expires_in: request.expires_in,
            created_at,
        };

        let token = self.generator.generate(&context)?;
        let refresh_token = if request.use_refresh_token {
            Some(self.refresh_token_generator.generate(&context)?)
        } else {
            None
        };

        let new_token = NewAccessToken {
            application_id: request.application.map(|app| app.id()),
            resource_owner_id: request.resource_owner_id,
            token,
            refresh_token,
            previous_refresh_token: request.previous_refresh_token.clone(),
            scopes: request.scopes.clone(),
            expires_in: request.expires_in,
            created_at,
        };

        validate_new_token(&new_token, request.use_refresh_token)?;
        Ok(new_token)
    }

    /// Revoke every active token for the application and owner.
    ///
    /// Each token is revoked by its own conditional update. Returns the
    /// number of tokens this call revoked.
    #[tracing::instrument(
        skip_all,
        fields(application_id = ?application_id, resource_owner_id = resource_owner.id())
    )]
    pub async fn revoke_all_for(
        &self,
        application_id: Option<ApplicationId>,
        resource_owner: &dyn ResourceOwner,
    ) -> TokenStoreResult<usize> {
        let tokens = self
            .repository
            .active_for(application_id, Some(resource_owner.id()))
            .await?;

        let revoked_at = Utc::now();
        let results = try_join_all(
            tokens
                .iter()
                .map(|token| self.repository.revoke(token.id, revoked_at)),
        )
        .await?;

        let revoked = results
            .iter()
            .flatten()
            .filter(|revocation| revocation.newly_revoked)
            .count();

        info!(revoked, "Revoked access tokens");
        Ok(revoked)
    }

    /// Revoke a single token. Revoking twice keeps the first timestamp.
    pub async fn revoke(&self, token: &AccessToken) -> TokenStoreResult<AccessToken> {
        let revoked = self
            .repository
            .revoke(token.id, Utc::now())
            .await?
            .ok_or(StorageError::NotFound { id: token.id })?
            .token;

        info!(token_id = revoked.id, "Access token revoked");
        Ok(revoked)
    }

    /// Look up a presented token and accept it only if it is accessible and
    /// grants every scope in `scopes`.
    pub async fn find_acceptable(
        &self,
        token: &str,
        scopes: &Scopes,
    ) -> TokenStoreResult<Option<AccessToken>> {
        Ok(self
            .by_token(token)
            .await?
            .filter(|found| found.acceptable(scopes)))
    }
}

/// Lifetimes must be non-negative and the resulting expiry representable.
fn validate_expires_in(
    expires_in: Option<i64>,
    created_at: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let Some(secs) = expires_in else {
        return Ok(());
    };

    let message = if secs < 0 {
        "must not be negative"
    } else if chrono::Duration::try_seconds(secs)
        .and_then(|lifetime| created_at.checked_add_signed(lifetime))
        .is_none()
    {
        "expiry exceeds the supported time range"
    } else {
        return Ok(());
    };

    Err(ValidationError::OutOfRange {
        field: "expires_in".to_string(),
        message: message.to_string(),
    })
}

fn validate_new_token(token: &NewAccessToken, use_refresh_token: bool) -> Result<(), ValidationError> {
    if token.token.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "token".to_string(),
        });
    }

    if use_refresh_token
        && token
            .refresh_token
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
    {
        return Err(ValidationError::Missing {
            field: "refresh_token".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockTokenGenerator;
    use crate::storage::{InMemoryAccessTokenRepository, MockAccessTokenRepository};
    use crate::types::{ClientApplication, GeneratorStrategy, Owner};
    use chrono::Duration;

    const MOCK: &str = "mock";

    fn config(reuse: bool) -> TokenStoreConfig {
        TokenStoreConfig {
            reuse_access_token: reuse,
            generator: GeneratorStrategy::Custom {
                name: MOCK.to_string(),
            },
            ..Default::default()
        }
    }

    fn mock_store(
        reuse: bool,
    ) -> (
        AccessTokenStore<MockAccessTokenRepository>,
        Arc<MockTokenGenerator>,
        Arc<MockAccessTokenRepository>,
    ) {
        let generator = Arc::new(MockTokenGenerator::new());
        let repository = Arc::new(MockAccessTokenRepository::new());
        let registry = GeneratorRegistry::new().register(generator.clone());
        let store = AccessTokenStore::with_registry(config(reuse), repository.clone(), &registry)
            .unwrap()
            .with_refresh_token_generator(generator.clone());
        (store, generator, repository)
    }

    fn app() -> ClientApplication {
        ClientApplication::new(1, "app-uid", Scopes::new())
    }

    #[tokio::test]
    async fn test_create_without_refresh_token() {
        let (store, generator, _) = mock_store(false);
        let app = app();

        let token = store
            .find_or_create_for(Some(&app), Some(5), &Scopes::from_string("read"), Some(60), false)
            .await
            .unwrap();

        assert_eq!(token.token, "mock-token-1");
        assert!(token.refresh_token.is_none());
        assert_eq!(generator.generate_count(), 1);
    }

    #[tokio::test]
    async fn test_collision_regenerates() {
        let (store, generator, repository) = mock_store(false);
        repository.push_insert_error(StorageError::UniqueViolation {
            field: "token".to_string(),
        });

        let token = store
            .create_for(AccessTokenRequest {
                resource_owner_id: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(token.token, "mock-token-2");
        assert_eq!(generator.generate_count(), 2);
        assert_eq!(repository.get_insert_history().len(), 2);
    }

    #[tokio::test]
    async fn test_collision_retry_is_bounded() {
        let (store, _, repository) = mock_store(false);
        for _ in 0..3 {
            repository.push_insert_error(StorageError::UniqueViolation {
                field: "refresh_token".to_string(),
            });
        }

        let err = store
            .create_for(AccessTokenRequest {
                use_refresh_token: true,
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TokenStoreError::Validation(ValidationError::NotUnique { ref field }) if field == "refresh_token"
        ));
        assert_eq!(repository.get_insert_history().len(), 3);
        assert!(repository.inner().is_empty());
    }

    #[tokio::test]
    async fn test_storage_error_propagates_without_retry() {
        let (store, _, repository) = mock_store(false);
        repository.push_insert_error(StorageError::Timeout {
            timeout: std::time::Duration::from_secs(2),
        });

        let err = store
            .create_for(AccessTokenRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TokenStoreError::Storage(StorageError::Timeout { .. })
        ));
        assert_eq!(repository.get_insert_history().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_generated_token_rejected() {
        let (store, generator, repository) = mock_store(false);
        generator.push_next_value("   ");

        let err = store
            .create_for(AccessTokenRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TokenStoreError::Validation(ValidationError::Missing { ref field }) if field == "token"
        ));
        assert!(repository.get_insert_history().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_rejected() {
        let (store, generator, repository) = mock_store(true);
        let app = app();

        for expires_in in [-1, 10_000_000_000_000, i64::MAX / 2] {
            let err = store
                .find_or_create_for(Some(&app), Some(1), &Scopes::new(), Some(expires_in), false)
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                TokenStoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "expires_in"
            ));
        }

        assert_eq!(generator.generate_count(), 0);
        assert!(repository.get_insert_history().is_empty());

        let token = store
            .find_or_create_for(Some(&app), Some(1), &Scopes::new(), Some(0), false)
            .await
            .unwrap();
        assert!(token.acceptable_at(&Scopes::new(), token.created_at));
    }

    #[tokio::test]
    async fn test_generator_failure_surfaces() {
        let (store, generator, repository) = mock_store(false);
        generator.set_should_fail(true);

        let err = store
            .create_for(AccessTokenRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "TOKEN_STORE_UNABLE_TO_GENERATE");
        assert!(repository.get_insert_history().is_empty());
    }

    #[tokio::test]
    async fn test_reuse_skips_generator() {
        let (store, generator, repository) = mock_store(true);
        let app = app();
        let scopes = Scopes::from_string("read");

        let first = store
            .find_or_create_for(Some(&app), Some(5), &scopes, Some(600), false)
            .await
            .unwrap();
        let second = store
            .find_or_create_for(Some(&app), Some(5), &scopes, Some(600), false)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.generate_count(), 1);
        assert_eq!(repository.get_insert_history().len(), 1);
    }

    #[tokio::test]
    async fn test_reuse_ignores_expired_match() {
        let (store, _, _) = mock_store(true);
        let app = app();
        let scopes = Scopes::from_string("read");

        let expired = store
            .create_for(AccessTokenRequest {
                application: Some(&app),
                resource_owner_id: Some(5),
                scopes: scopes.clone(),
                expires_in: Some(60),
                created_at: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();

        let issued = store
            .find_or_create_for(Some(&app), Some(5), &scopes, Some(60), false)
            .await
            .unwrap();

        assert_ne!(issued.token, expired.token);
        assert!(!issued.is_expired());
    }

    #[tokio::test]
    async fn test_revoke_single_token() {
        let (store, _, _) = mock_store(false);
        let token = store
            .create_for(AccessTokenRequest::default())
            .await
            .unwrap();

        let revoked = store.revoke(&token).await.unwrap();
        assert!(revoked.revoked_at.is_some());

        let again = store.revoke(&revoked).await.unwrap();
        assert_eq!(again.revoked_at, revoked.revoked_at);
    }

    #[tokio::test]
    async fn test_revoke_missing_token() {
        let repository = Arc::new(InMemoryAccessTokenRepository::new());
        let store = AccessTokenStore::new(TokenStoreConfig::default(), repository).unwrap();
        let ghost = AccessToken::from_new(
            404,
            NewAccessToken {
                application_id: None,
                resource_owner_id: None,
                token: "ghost".to_string(),
                refresh_token: None,
                previous_refresh_token: None,
                scopes: Scopes::new(),
                expires_in: None,
                created_at: Utc::now(),
            },
        );

        let err = store.revoke(&ghost).await.unwrap_err();
        assert!(matches!(
            err,
            TokenStoreError::Storage(StorageError::NotFound { id: 404 })
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_counts_only_active() {
        let (store, _, _) = mock_store(false);
        let app = app();
        let owner = Owner::new(5);

        for _ in 0..3 {
            store
                .find_or_create_for(Some(&app), Some(5), &Scopes::new(), None, false)
                .await
                .unwrap();
        }

        assert_eq!(store.revoke_all_for(Some(1), &owner).await.unwrap(), 3);
        assert_eq!(store.revoke_all_for(Some(1), &owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_acceptable() {
        let (store, _, _) = mock_store(false);
        let token = store
            .create_for(AccessTokenRequest {
                scopes: Scopes::from_string("read"),
                expires_in: Some(600),
                ..Default::default()
            })
            .await
            .unwrap();

        let read = Scopes::from_string("read");
        assert!(store.find_acceptable(&token.token, &read).await.unwrap().is_some());
        assert!(store
            .find_acceptable(&token.token, &Scopes::from_string("write"))
            .await
            .unwrap()
            .is_none());
        assert!(store.find_acceptable("unknown", &read).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates_from_find_acceptable() {
        let (store, _, repository) = mock_store(false);
        repository.set_next_error(StorageError::Cancelled);

        let err = store
            .find_acceptable("any", &Scopes::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TokenStoreError::Storage(StorageError::Cancelled)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_matching_token_for_dyn_owner() {
        let (store, _, _) = mock_store(false);
        let app = app();
        let owner = Owner::new(5);
        let owner: &dyn ResourceOwner = &owner;

        store
            .find_or_create_for(Some(&app), Some(5), &Scopes::from_string("read"), None, false)
            .await
            .unwrap();

        let matched = store
            .matching_token_for(Some(&app), owner, &Scopes::from_string("read"))
            .await
            .unwrap();
        assert!(matched.is_some());
    }

    #[test]
    fn test_unknown_generator_fails_at_build() {
        let repository = Arc::new(InMemoryAccessTokenRepository::new());
        let result = AccessTokenStore::new(config(false), repository);

        assert!(matches!(
            result,
            Err(TokenStoreError::Generator(
                crate::error::GeneratorError::TokenGeneratorNotFound { .. }
            ))
        ));
    }
}
