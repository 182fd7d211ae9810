//! Product builds: per-product tasks, project-wide steps and the build plan.
//!
//! - [`tasks`] - Clone, prepare, install, build, image and save a product
//! - [`global`] - Clean, prune, compose, push and summary steps
//! - [`plan`] - Step registry and default chain
//! - [`workspace`], [`image`], [`data`], [`fs`] - Helpers used by the tasks

pub mod data;
pub mod fs;
pub mod global;
pub mod image;
pub mod plan;
pub mod tasks;
pub mod workspace;

use std::path::PathBuf;

use crate::config::{BuildContext, ResolvedProduct};
use crate::runner::FailureMarker;

pub use plan::{BuildPlan, META_STEPS};

/// One product of the build together with its failure record.
#[derive(Debug)]
pub struct Product {
    /// Descriptor with defaults applied.
    pub spec: ResolvedProduct,
    /// Set by the first failing task of this product.
    pub failure: FailureMarker,
}

impl Product {
    /// Wrap a resolved descriptor.
    pub fn new(spec: ResolvedProduct) -> Self {
        Self {
            spec,
            failure: FailureMarker::new(),
        }
    }

    /// Product name, used as step suffix.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Absolute workspace directory.
    pub fn workspace(&self, ctx: &BuildContext) -> PathBuf {
        ctx.path(&self.spec.tmp_dir)
    }

    /// Check whether a task of this product failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_failed()
    }
}
