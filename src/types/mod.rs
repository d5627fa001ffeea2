//! Token Store Types
//!
//! Core type definitions for access token lifecycle management.

pub mod capabilities;
pub mod config;
pub mod identity;
pub mod scopes;
pub mod token;

pub use capabilities::*;
pub use config::*;
pub use identity::*;
pub use scopes::*;
pub use token::*;
