//! Token Types
//!
//! Access token record, insertion payload and the wire views returned to
//! clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Accessible, Application, ApplicationId, Expirable, HasScopes, ResourceOwnerId, Revocable,
    Scopes,
};

/// Token type reported for every access token.
pub const TOKEN_TYPE: &str = "bearer";

/// Repository-assigned token identifier.
pub type AccessTokenId = i64;

/// Persisted access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: AccessTokenId,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub resource_owner_id: Option<ResourceOwnerId>,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub previous_refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Scopes,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Build a persisted token from an insertion payload.
    pub fn from_new(id: AccessTokenId, new: NewAccessToken) -> Self {
        Self {
            id,
            application_id: new.application_id,
            resource_owner_id: new.resource_owner_id,
            token: new.token,
            refresh_token: new.refresh_token,
            previous_refresh_token: new.previous_refresh_token,
            scopes: new.scopes,
            expires_in: new.expires_in,
            created_at: new.created_at,
            revoked_at: None,
        }
    }

    pub fn token_type(&self) -> &'static str {
        TOKEN_TYPE
    }

    pub fn has_application(&self) -> bool {
        self.application_id.is_some()
    }

    /// Whether the token was issued with a refresh token.
    pub fn use_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Whether both tokens were issued for the same application and owner.
    pub fn same_credential(&self, other: &AccessToken) -> bool {
        self.application_id == other.application_id
            && self.resource_owner_id == other.resource_owner_id
    }

    /// Check the token may authorize a request needing `scopes`.
    pub fn acceptable(&self, scopes: &Scopes) -> bool {
        self.acceptable_at(scopes, Utc::now())
    }

    pub fn acceptable_at(&self, scopes: &Scopes, now: DateTime<Utc>) -> bool {
        self.is_accessible_at(now) && self.includes_scope(scopes)
    }

    /// Serialization view returned to token-issuance clients.
    pub fn as_view(
        &self,
        application: Option<&dyn Application>,
        now: DateTime<Utc>,
    ) -> AccessTokenView {
        AccessTokenView {
            resource_owner_id: self.resource_owner_id,
            scopes: self.scopes.clone(),
            expires_in_seconds: self.expires_in_seconds_at(now),
            application: ApplicationView {
                uid: application.map(|app| app.uid().to_string()),
            },
            created_at: self.created_at.timestamp(),
        }
    }

    /// RFC 6749 section 5.1 token response body.
    pub fn to_response(&self, now: DateTime<Utc>) -> TokenResponse {
        TokenResponse {
            access_token: self.token.clone(),
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.expires_in_seconds_at(now),
            refresh_token: self.refresh_token.clone(),
            scope: if self.scopes.is_empty() {
                None
            } else {
                Some(self.scopes.to_string())
            },
            created_at: self.created_at.timestamp(),
        }
    }
}

impl Expirable for AccessToken {
    fn expires_in(&self) -> Option<i64> {
        self.expires_in
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Revocable for AccessToken {
    fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }
}

impl HasScopes for AccessToken {
    fn scopes(&self) -> &Scopes {
        &self.scopes
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("id", &self.id)
            .field("application_id", &self.application_id)
            .field("resource_owner_id", &self.resource_owner_id)
            .field("token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .field("revoked_at", &self.revoked_at)
            .finish()
    }
}

/// Insertion payload handed to a repository.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccessToken {
    pub application_id: Option<ApplicationId>,
    pub resource_owner_id: Option<ResourceOwnerId>,
    pub token: String,
    pub refresh_token: Option<String>,
    pub previous_refresh_token: Option<String>,
    pub scopes: Scopes,
    pub expires_in: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for NewAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccessToken")
            .field("application_id", &self.application_id)
            .field("resource_owner_id", &self.resource_owner_id)
            .field("token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scopes", &self.scopes)
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Application reference inside [`AccessTokenView`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationView {
    pub uid: Option<String>,
}

/// Token information exposed to clients (introspection-style).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenView {
    pub resource_owner_id: Option<ResourceOwnerId>,
    pub scopes: Scopes,
    pub expires_in_seconds: Option<i64>,
    pub application: ApplicationView,
    /// Epoch seconds.
    pub created_at: i64,
}

/// Token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub created_at: i64,
}
