//! OAuth2 Token Store
//!
//! Access token lifecycle management for an OAuth2 authorization server.
//!
//! # Features
//!
//! - Token issuance with optional reuse of a matching unexpired token
//! - Pluggable credential generation (random opaque tokens, HS256 JWTs, custom)
//! - Lookup by access token and refresh token
//! - Scope matching against granted and application-allowed scopes
//! - Single and bulk revocation
//! - Request authorization (`acceptable` checks)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_token_store::{
//!     token_store_config, AccessTokenStore, ClientApplication, InMemoryAccessTokenRepository,
//!     Scopes,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = token_store_config().reuse_access_token(true).build()?;
//!     let store = AccessTokenStore::new(config, Arc::new(InMemoryAccessTokenRepository::new()))?;
//!
//!     let app = ClientApplication::new(1, "client-uid", Scopes::from_string("read write"));
//!     let token = store
//!         .find_or_create_for(Some(&app), Some(42), &Scopes::from_string("read"), Some(7200), true)
//!         .await?;
//!
//!     assert!(token.acceptable(&Scopes::from_string("read")));
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: token record, scopes, identities, capabilities and configuration
//! - `error`: error hierarchy
//! - `core`: token generators, generator registry and scope matching
//! - `storage`: repository contract with in-memory and mock implementations
//! - `token`: the access token store
//! - `builders`: fluent configuration builder

pub mod builders;
pub mod core;
pub mod error;
pub mod storage;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{token_store_config, TokenStoreConfigBuilder};

// Re-export errors
pub use error::{
    ConfigurationError, GeneratorError, StorageError, TokenStoreError, TokenStoreResult,
    ValidationError,
};

// Re-export types
pub use types::{
    // Token
    AccessToken, AccessTokenId, AccessTokenView, ApplicationView, NewAccessToken, TokenResponse,
    TOKEN_TYPE,
    // Capabilities
    Accessible, Expirable, HasScopes, Revocable,
    // Scopes
    Scopes,
    // Identity
    Application, ApplicationId, ClientApplication, Owner, ResourceOwner, ResourceOwnerId,
    ResourceOwnerRef,
    // Config
    GeneratorStrategy, TokenStoreConfig, DEFAULT_MAX_GENERATION_ATTEMPTS,
};

// Re-export core components
pub use crate::core::{
    // Generators
    create_mock_token_generator, create_token_generator, MockTokenGenerator,
    SecureRandomGenerator, TokenEncoding, TokenGenerationContext, TokenGenerator,
    // Registry
    GeneratorRegistry,
    // Scope matching
    DefaultScopeMatcher, ScopeChecker, ScopeMatcher,
};

#[cfg(feature = "jwt")]
pub use crate::core::JwtTokenGenerator;

// Re-export storage
pub use storage::{
    create_in_memory_repository, create_mock_repository, AccessTokenRepository,
    InMemoryAccessTokenRepository, MockAccessTokenRepository, Revocation,
};

// Re-export token store
pub use token::{AccessTokenRequest, AccessTokenStore};
