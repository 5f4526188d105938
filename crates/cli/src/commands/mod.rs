//! CLI subcommand implementations.

pub mod collection;
pub mod watch;
