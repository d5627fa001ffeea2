//! Generator Registry
//!
//! Explicit registration of custom token generators, resolved against the
//! configured [`GeneratorStrategy`] when a store is built.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::generator::{SecureRandomGenerator, TokenGenerator};
use crate::error::GeneratorError;
use crate::types::GeneratorStrategy;

/// Registry of named token generators.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn TokenGenerator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator under its own name, replacing any previous entry.
    pub fn register(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.generators
            .insert(generator.name().to_string(), generator);
        self
    }

    /// Register a generator under an explicit name.
    pub fn register_as(mut self, name: impl Into<String>, generator: Arc<dyn TokenGenerator>) -> Self {
        self.generators.insert(name.into(), generator);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the generator for a strategy.
    pub fn resolve(
        &self,
        strategy: &GeneratorStrategy,
    ) -> Result<Arc<dyn TokenGenerator>, GeneratorError> {
        debug!(strategy = strategy.name(), "Resolving token generator");

        match strategy {
            GeneratorStrategy::SecureRandom => Ok(Arc::new(SecureRandomGenerator::new())),
            GeneratorStrategy::Jwt { secret, issuer } => Self::resolve_jwt(secret, issuer),
            GeneratorStrategy::Custom { name } => self.generators.get(name).cloned().ok_or_else(
                || GeneratorError::TokenGeneratorNotFound { name: name.clone() },
            ),
        }
    }

    #[cfg(feature = "jwt")]
    fn resolve_jwt(
        secret: &secrecy::SecretString,
        issuer: &Option<String>,
    ) -> Result<Arc<dyn TokenGenerator>, GeneratorError> {
        Ok(Arc::new(super::generator::JwtTokenGenerator::new(
            secret,
            issuer.clone(),
        )))
    }

    #[cfg(not(feature = "jwt"))]
    fn resolve_jwt(
        _secret: &secrecy::SecretString,
        _issuer: &Option<String>,
    ) -> Result<Arc<dyn TokenGenerator>, GeneratorError> {
        Err(GeneratorError::TokenGeneratorNotFound {
            name: "jwt".to_string(),
        })
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.names())
            .finish()
    }
}
