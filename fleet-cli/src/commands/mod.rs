//! Subcommand implementations.

pub mod group;
pub mod plan;
pub mod validate;
