//! Token Management
//!
//! Access token lifecycle: issuance with reuse detection, lookup,
//! revocation and request authorization.

pub mod store;

pub use store::{AccessTokenRequest, AccessTokenStore};
