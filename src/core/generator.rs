//! Token Generators
//!
//! Credential generation strategies for access and refresh tokens.

use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use std::collections::VecDeque;

use crate::error::GeneratorError;
use crate::types::{Application, ResourceOwnerId, Scopes};

/// Default number of random bytes in an opaque token.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Minimum number of random bytes accepted for an opaque token.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Read-only inputs available to a generator.
#[derive(Clone, Copy)]
pub struct TokenGenerationContext<'a> {
    pub resource_owner_id: Option<ResourceOwnerId>,
    pub scopes: &'a Scopes,
    pub application: Option<&'a dyn Application>,
    pub expires_in: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenGenerationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGenerationContext")
            .field("resource_owner_id", &self.resource_owner_id)
            .field("scopes", self.scopes)
            .field("application", &self.application.map(|app| app.id()))
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Token generator interface.
///
/// Implementations must not perform I/O so generation can be retried freely.
pub trait TokenGenerator: Send + Sync {
    /// Strategy name.
    fn name(&self) -> &str;

    /// Generate a credential value.
    fn generate(&self, context: &TokenGenerationContext<'_>) -> Result<String, GeneratorError>;
}

/// Output encoding for random tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenEncoding {
    /// Lowercase hexadecimal.
    #[default]
    Hex,
    /// Unpadded URL-safe base64.
    Base64Url,
}

/// Random opaque token generator.
pub struct SecureRandomGenerator {
    byte_length: usize,
    encoding: TokenEncoding,
}

impl SecureRandomGenerator {
    /// Create generator producing 32 random bytes, hex encoded.
    pub fn new() -> Self {
        Self::with_length(DEFAULT_TOKEN_BYTES)
    }

    /// Create generator with a custom number of random bytes.
    ///
    /// # Panics
    /// Panics if length is below 16 bytes.
    pub fn with_length(byte_length: usize) -> Self {
        assert!(
            byte_length >= MIN_TOKEN_BYTES,
            "Token length must be at least 16 bytes"
        );
        Self {
            byte_length,
            encoding: TokenEncoding::Hex,
        }
    }

    /// Set output encoding.
    pub fn encoding(mut self, encoding: TokenEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Generate a random value without a context.
    pub fn random_value(&self) -> String {
        let mut bytes = vec![0u8; self.byte_length];
        rand::thread_rng().fill_bytes(&mut bytes);

        match self.encoding {
            TokenEncoding::Hex => hex::encode(&bytes),
            TokenEncoding::Base64Url => {
                base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes)
            }
        }
    }
}

impl Default for SecureRandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator for SecureRandomGenerator {
    fn name(&self) -> &str {
        "secure_random"
    }

    fn generate(&self, _context: &TokenGenerationContext<'_>) -> Result<String, GeneratorError> {
        Ok(self.random_value())
    }
}

#[cfg(feature = "jwt")]
pub use jwt::JwtTokenGenerator;

#[cfg(feature = "jwt")]
mod jwt {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use secrecy::{ExposeSecret, SecretString};
    use serde::Serialize;

    use super::{SecureRandomGenerator, TokenGenerationContext, TokenGenerator, MIN_TOKEN_BYTES};
    use crate::error::GeneratorError;

    #[derive(Serialize)]
    struct AccessTokenClaims<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sub: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aud: Option<&'a str>,
        scope: String,
        iat: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        exp: Option<i64>,
        jti: String,
    }

    /// HS256 JWT access token generator.
    ///
    /// Claims carry the grant so resource servers can validate tokens without
    /// a lookup. `jti` is random so equal grants still yield distinct tokens.
    pub struct JwtTokenGenerator {
        key: EncodingKey,
        issuer: Option<String>,
        jti: SecureRandomGenerator,
    }

    impl JwtTokenGenerator {
        pub fn new(secret: &SecretString, issuer: Option<String>) -> Self {
            Self {
                key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
                issuer,
                jti: SecureRandomGenerator::with_length(MIN_TOKEN_BYTES),
            }
        }
    }

    impl TokenGenerator for JwtTokenGenerator {
        fn name(&self) -> &str {
            "jwt"
        }

        fn generate(
            &self,
            context: &TokenGenerationContext<'_>,
        ) -> Result<String, GeneratorError> {
            let iat = context.created_at.timestamp();
            let exp = match context.expires_in {
                Some(secs) => Some(iat.checked_add(secs).ok_or_else(|| {
                    GeneratorError::UnableToGenerateToken {
                        generator: self.name().to_string(),
                        message: format!("expires_in {} overflows the exp claim", secs),
                    }
                })?),
                None => None,
            };

            let claims = AccessTokenClaims {
                iss: self.issuer.as_deref(),
                sub: context.resource_owner_id.map(|id| id.to_string()),
                aud: context.application.map(|app| app.uid()),
                scope: context.scopes.to_string(),
                iat,
                exp,
                jti: self.jti.random_value(),
            };

            encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| {
                GeneratorError::UnableToGenerateToken {
                    generator: self.name().to_string(),
                    message: e.to_string(),
                }
            })
        }
    }
}

/// Mock token generator for testing.
#[derive(Default)]
pub struct MockTokenGenerator {
    next_values: Mutex<VecDeque<String>>,
    generate_history: Mutex<Vec<(Option<ResourceOwnerId>, String)>>,
    counter: Mutex<u64>,
    should_fail: Mutex<bool>,
}

impl MockTokenGenerator {
    /// Create new mock token generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value to return from the next `generate` call.
    pub fn push_next_value(&self, value: impl Into<String>) -> &Self {
        self.next_values.lock().push_back(value.into());
        self
    }

    /// Make every `generate` call fail.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock() = should_fail;
        self
    }

    /// Resource owner and scopes seen by each `generate` call.
    pub fn get_generate_history(&self) -> Vec<(Option<ResourceOwnerId>, String)> {
        self.generate_history.lock().clone()
    }

    pub fn generate_count(&self) -> usize {
        self.generate_history.lock().len()
    }
}

impl TokenGenerator for MockTokenGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, context: &TokenGenerationContext<'_>) -> Result<String, GeneratorError> {
        if *self.should_fail.lock() {
            return Err(GeneratorError::UnableToGenerateToken {
                generator: self.name().to_string(),
                message: "Mock generator failure".to_string(),
            });
        }

        self.generate_history
            .lock()
            .push((context.resource_owner_id, context.scopes.to_string()));

        if let Some(value) = self.next_values.lock().pop_front() {
            return Ok(value);
        }

        let mut counter = self.counter.lock();
        *counter += 1;
        Ok(format!("mock-token-{}", *counter))
    }
}

/// Create production token generator.
pub fn create_token_generator() -> impl TokenGenerator {
    SecureRandomGenerator::new()
}

/// Create mock token generator for testing.
pub fn create_mock_token_generator() -> MockTokenGenerator {
    MockTokenGenerator::new()
}
