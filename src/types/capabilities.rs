//! Token Capabilities
//!
//! Expiry, revocation and scope checks shared by token-like records.

use chrono::{DateTime, Duration, Utc};

use super::Scopes;

/// Time-limited credential.
pub trait Expirable {
    /// Lifetime in seconds. `None` means the credential never expires.
    fn expires_in(&self) -> Option<i64>;

    /// Issue time.
    fn created_at(&self) -> DateTime<Utc>;

    /// Instant after which the credential is expired.
    ///
    /// `None` when the credential never expires, or when the lifetime does
    /// not fit the calendar range.
    fn expired_time(&self) -> Option<DateTime<Utc>> {
        self.expires_in()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.created_at().checked_add_signed(lifetime))
    }

    /// Check expiry at a given instant.
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expired_time().map(|exp| now > exp).unwrap_or(false)
    }

    /// Check if credential is expired.
    fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Remaining lifetime in whole seconds, rounded and floored at zero.
    fn expires_in_seconds_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expired_time().map(|exp| {
            let remaining_ms = (exp - now).num_milliseconds();
            ((remaining_ms as f64) / 1000.0).round().max(0.0) as i64
        })
    }

    fn expires_in_seconds(&self) -> Option<i64> {
        self.expires_in_seconds_at(Utc::now())
    }
}

/// Credential that can be revoked.
///
/// Setting the revocation timestamp goes through the store so the update is
/// applied atomically by the repository.
pub trait Revocable {
    fn revoked_at(&self) -> Option<DateTime<Utc>>;

    /// A revocation timestamp in the future is not yet effective.
    fn is_revoked_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at().map(|at| at <= now).unwrap_or(false)
    }

    fn is_revoked(&self) -> bool {
        self.is_revoked_at(Utc::now())
    }
}

/// Credential usable for authorization: neither revoked nor expired.
pub trait Accessible: Expirable + Revocable {
    fn is_accessible_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && !self.is_revoked_at(now)
    }

    fn is_accessible(&self) -> bool {
        self.is_accessible_at(Utc::now())
    }
}

impl<T: Expirable + Revocable> Accessible for T {}

/// Credential carrying granted scopes.
pub trait HasScopes {
    fn scopes(&self) -> &Scopes;

    /// True when every required scope is granted. An empty requirement is
    /// always included.
    fn includes_scope(&self, required: &Scopes) -> bool {
        self.scopes().has_scopes(required)
    }
}
