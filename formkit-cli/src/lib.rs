//! Library half of the `formkit` binary.
//!
//! The CLI definition and command implementations live here so they can be
//! tested without spawning the binary.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
