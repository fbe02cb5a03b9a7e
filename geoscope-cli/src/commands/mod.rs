//! CLI subcommand implementations.

pub mod demo;
pub mod fetch;
pub mod probe;
