//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::Parser;
use std::path::PathBuf;

use crate::config::BuildOptions;

/// Build all repositories of a Phovea product into docker images.
#[derive(Debug, Parser)]
#[command(name = "phovea-build")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Reduce log messages; subprocess output is shown only on failure
    #[arg(long)]
    pub quiet: bool,

    /// Build elements sequentially
    #[arg(long)]
    pub serial: bool,

    /// Skip tests: sets PHOVEA_SKIP_TESTS for child processes
    #[arg(long)]
    pub skip_tests: bool,

    /// Inject the product version into the package.json of the built component
    #[arg(long)]
    pub inject_version: bool,

    /// Clone via ssh instead of https
    #[arg(long = "use-ssh")]
    pub use_ssh: bool,

    /// Skip cleaning up old docker images
    #[arg(long)]
    pub skip_clean_up: bool,

    /// Skip saving the generated docker images
    #[arg(long)]
    pub skip_save_image: bool,

    /// Push docker images to the given registry
    #[arg(long, value_name = "REGISTRY")]
    pub push_to: Option<String>,

    /// Do not push the generated default tags
    #[arg(long)]
    pub no_default_tags: bool,

    /// Push an additional custom tag, e.g. --push-extra=develop
    #[arg(long, value_name = "TAG")]
    pub push_extra: Option<String>,

    /// Use the label in image names even when only a single service exists
    #[arg(long)]
    pub force_label: bool,

    /// Just compute the chain, do not execute it
    #[arg(long)]
    pub dry_run: bool,

    /// List primary and secondary steps and the default chain
    #[arg(long)]
    pub list: bool,

    /// Path to project root (overrides current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Scaffolding generator executable
    #[arg(long, env = "PHOVEA_GENERATOR", default_value = "yo")]
    pub generator: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Steps to execute in the given order instead of the default chain
    #[arg(value_name = "STEP", trailing_var_arg = true)]
    pub steps: Vec<String>,
}

impl Cli {
    /// Build options selected by the flags.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            quiet: self.quiet,
            serial: self.serial,
            skip_tests: self.skip_tests,
            inject_version: self.inject_version,
            use_ssh: self.use_ssh,
            skip_clean_up: self.skip_clean_up,
            skip_save_image: self.skip_save_image,
            push_to: self.push_to.clone(),
            no_default_tags: self.no_default_tags,
            push_extra: self.push_extra.clone(),
            force_label: self.force_label,
        }
    }
}
