//! Scope Matching
//!
//! Decides whether an existing token's scopes satisfy a new request.

use crate::types::Scopes;

/// Scope matcher interface (for dependency injection).
pub trait ScopeMatcher: Send + Sync {
    /// Check requested scopes against a token's scopes and the scopes the
    /// application is allowed to use.
    fn matches(
        &self,
        token_scopes: &Scopes,
        requested_scopes: &Scopes,
        application_scopes: Option<&Scopes>,
    ) -> bool;
}

/// Scope compatibility rules.
pub struct ScopeChecker;

impl ScopeChecker {
    /// A token matches when it has scopes, covers every requested scope, and
    /// each requested scope is allowed for the application. An application
    /// without configured scopes allows everything.
    pub fn is_match(
        token_scopes: &Scopes,
        requested_scopes: &Scopes,
        application_scopes: Option<&Scopes>,
    ) -> bool {
        if token_scopes.is_empty() || !token_scopes.has_scopes(requested_scopes) {
            return false;
        }

        match application_scopes {
            Some(allowed) if !allowed.is_empty() => allowed.has_scopes(requested_scopes),
            _ => true,
        }
    }
}

/// Default scope matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScopeMatcher;

impl DefaultScopeMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ScopeMatcher for DefaultScopeMatcher {
    fn matches(
        &self,
        token_scopes: &Scopes,
        requested_scopes: &Scopes,
        application_scopes: Option<&Scopes>,
    ) -> bool {
        // A scopeless token is compatible with a scopeless request.
        (token_scopes.is_empty() && requested_scopes.is_empty())
            || ScopeChecker::is_match(token_scopes, requested_scopes, application_scopes)
    }
}
