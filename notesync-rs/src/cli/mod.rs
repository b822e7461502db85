//! CLI command implementations.

pub mod args;
pub mod output;

pub mod index;
pub mod migrate;
pub mod pattern;

pub use args::{Cli, Commands};
pub use output::Output;
