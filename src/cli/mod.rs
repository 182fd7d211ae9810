//! Command-line interface for phovea-build.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`build`] - The build command

pub mod args;
pub mod build;

pub use args::Cli;
pub use build::{BuildCommand, CommandResult, YoRcStash};
