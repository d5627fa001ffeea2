//! Configuration Types
//!
//! Token store configuration. Values are read once when the store is built
//! and never change afterwards.

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{ConfigurationError, TokenStoreError};

/// Default number of attempts to persist a token with fresh credentials.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 3;

fn default_max_generation_attempts() -> u32 {
    DEFAULT_MAX_GENERATION_ATTEMPTS
}

/// Token generation strategy.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum GeneratorStrategy {
    /// Random opaque tokens.
    #[default]
    SecureRandom,
    /// Self-contained HS256 JWTs (requires the `jwt` feature).
    Jwt {
        secret: SecretString,
        #[serde(default)]
        issuer: Option<String>,
    },
    /// Generator registered by name in a `GeneratorRegistry`.
    Custom { name: String },
}

impl GeneratorStrategy {
    /// Strategy name used in logs and errors.
    pub fn name(&self) -> &str {
        match self {
            Self::SecureRandom => "secure_random",
            Self::Jwt { .. } => "jwt",
            Self::Custom { name } => name,
        }
    }
}

/// Token store configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenStoreConfig {
    /// Return an existing unexpired matching token instead of issuing a new one.
    #[serde(default)]
    pub reuse_access_token: bool,
    /// Access token generation strategy.
    #[serde(default)]
    pub generator: GeneratorStrategy,
    /// Attempts to persist a token before giving up on credential collisions.
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: u32,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            reuse_access_token: false,
            generator: GeneratorStrategy::default(),
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
        }
    }
}

impl TokenStoreConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TokenStoreError> {
        if self.max_generation_attempts == 0 {
            return Err(ConfigurationError::InvalidConfig {
                message: "max_generation_attempts must be at least 1".to_string(),
            }
            .into());
        }

        if let GeneratorStrategy::Custom { name } = &self.generator {
            if name.trim().is_empty() {
                return Err(ConfigurationError::MissingRequired {
                    field: "generator.name".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
