//! Configuration Builder
//!
//! Fluent builder for token store configuration.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigurationError, TokenStoreError};
use crate::types::{GeneratorStrategy, TokenStoreConfig, DEFAULT_MAX_GENERATION_ATTEMPTS};

/// Token store configuration builder.
pub struct TokenStoreConfigBuilder {
    reuse_access_token: bool,
    generator: GeneratorStrategy,
    max_generation_attempts: u32,
}

impl Default for TokenStoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStoreConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            reuse_access_token: false,
            generator: GeneratorStrategy::SecureRandom,
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
        }
    }

    /// Enable or disable access token reuse.
    pub fn reuse_access_token(mut self, enable: bool) -> Self {
        self.reuse_access_token = enable;
        self
    }

    /// Use random opaque tokens.
    pub fn secure_random_tokens(mut self) -> Self {
        self.generator = GeneratorStrategy::SecureRandom;
        self
    }

    /// Use HS256 JWT access tokens.
    pub fn jwt_tokens(mut self, secret: impl Into<String>, issuer: Option<String>) -> Self {
        self.generator = GeneratorStrategy::Jwt {
            secret: SecretString::new(secret.into()),
            issuer,
        };
        self
    }

    /// Use a generator registered under `name`.
    pub fn custom_generator(mut self, name: impl Into<String>) -> Self {
        self.generator = GeneratorStrategy::Custom { name: name.into() };
        self
    }

    /// Set attempts to persist a token before giving up on collisions.
    pub fn max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts;
        self
    }

    /// Build the token store configuration.
    pub fn build(self) -> Result<TokenStoreConfig, TokenStoreError> {
        if let GeneratorStrategy::Jwt { secret, .. } = &self.generator {
            if secret.expose_secret().is_empty() {
                return Err(ConfigurationError::MissingRequired {
                    field: "jwt secret".to_string(),
                }
                .into());
            }
        }

        let config = TokenStoreConfig {
            reuse_access_token: self.reuse_access_token,
            generator: self.generator,
            max_generation_attempts: self.max_generation_attempts,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Create a new token store configuration builder.
pub fn token_store_config() -> TokenStoreConfigBuilder {
    TokenStoreConfigBuilder::new()
}
