//! Lyfe-core: identifiers, error taxonomy and router configuration
//!
//! Leaf crate of the workspace; the math kernel, the pricing engines and
//! the router all speak these types.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
