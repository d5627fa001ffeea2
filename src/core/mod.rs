//! Token Store Core Components
//!
//! Leaf components used by the store: credential generation and scope
//! matching.

pub mod generator;
pub mod registry;
pub mod scopes;

pub use generator::*;
pub use registry::*;
pub use scopes::*;
