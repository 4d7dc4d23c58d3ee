//! Subcommand implementations. Each returns a serializable report.

pub mod join;
pub mod quote;
pub mod route;
