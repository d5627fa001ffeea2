//! Identity Types
//!
//! Client application and resource owner identities. The token store only
//! reads the accessors defined here; registration and authentication of
//! these identities live elsewhere.

use serde::{Deserialize, Serialize};

use super::Scopes;

/// Application identifier.
pub type ApplicationId = i64;

/// Resource owner identifier.
pub type ResourceOwnerId = i64;

/// OAuth2 client application.
pub trait Application: Send + Sync {
    /// Registry identifier.
    fn id(&self) -> ApplicationId;

    /// Public client identifier (`client_id`).
    fn uid(&self) -> &str;

    /// Scopes the application is allowed to request. Empty means unrestricted.
    fn scopes(&self) -> &Scopes;
}

/// Resource owner on whose behalf tokens are issued.
pub trait ResourceOwner: Send + Sync {
    fn id(&self) -> ResourceOwnerId;
}

/// Plain client application record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientApplication {
    pub id: ApplicationId,
    pub uid: String,
    #[serde(default)]
    pub scopes: Scopes,
}

impl ClientApplication {
    /// Create new client application.
    pub fn new(id: ApplicationId, uid: impl Into<String>, scopes: Scopes) -> Self {
        Self {
            id,
            uid: uid.into(),
            scopes,
        }
    }
}

impl Application for ClientApplication {
    fn id(&self) -> ApplicationId {
        self.id
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn scopes(&self) -> &Scopes {
        &self.scopes
    }
}

/// Plain resource owner record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: ResourceOwnerId,
}

impl Owner {
    pub fn new(id: ResourceOwnerId) -> Self {
        Self { id }
    }
}

impl ResourceOwner for Owner {
    fn id(&self) -> ResourceOwnerId {
        self.id
    }
}

/// Either a resource owner object or its bare identifier.
#[derive(Clone, Copy)]
pub enum ResourceOwnerRef<'a> {
    Owner(&'a dyn ResourceOwner),
    Id(ResourceOwnerId),
    /// Tokens issued without a resource owner (client credentials).
    None,
}

impl ResourceOwnerRef<'_> {
    /// Resolve to an identifier.
    pub fn id(&self) -> Option<ResourceOwnerId> {
        match self {
            Self::Owner(owner) => Some(owner.id()),
            Self::Id(id) => Some(*id),
            Self::None => None,
        }
    }
}

impl std::fmt::Debug for ResourceOwnerRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(owner) => f.debug_tuple("Owner").field(&owner.id()).finish(),
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::None => f.write_str("None"),
        }
    }
}

impl<'a, T: ResourceOwner> From<&'a T> for ResourceOwnerRef<'a> {
    fn from(owner: &'a T) -> Self {
        Self::Owner(owner)
    }
}

impl<'a> From<&'a dyn ResourceOwner> for ResourceOwnerRef<'a> {
    fn from(owner: &'a dyn ResourceOwner) -> Self {
        Self::Owner(owner)
    }
}

impl From<ResourceOwnerId> for ResourceOwnerRef<'_> {
    fn from(id: ResourceOwnerId) -> Self {
        Self::Id(id)
    }
}

impl From<Option<ResourceOwnerId>> for ResourceOwnerRef<'_> {
    fn from(id: Option<ResourceOwnerId>) -> Self {
        id.map_or(Self::None, Self::Id)
    }
}
