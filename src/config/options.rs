//! Run options and the context handed to every build task.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable set for child processes when tests are skipped.
pub const SKIP_TESTS_VAR: &str = "PHOVEA_SKIP_TESTS";

/// Flags controlling a build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Capture subprocess output, print it only on failure.
    pub quiet: bool,
    /// Run products and groups one after another.
    pub serial: bool,
    /// Skip server test dependencies and tell child builds to skip tests.
    pub skip_tests: bool,
    /// Write the product version into each workspace `package.json`.
    pub inject_version: bool,
    /// Clone via SSH instead of HTTPS.
    pub use_ssh: bool,
    /// Keep old docker images of this product.
    pub skip_clean_up: bool,
    /// Do not `docker save` built images.
    pub skip_save_image: bool,
    /// Registry to push images to.
    pub push_to: Option<String>,
    /// Do not push the default `<registry>/<image>` tags.
    pub no_default_tags: bool,
    /// Extra tag pushed in place of the version.
    pub push_extra: Option<String>,
    /// Label images even when only one product exists.
    pub force_label: bool,
}

/// Everything a build task needs besides its product.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Run options.
    pub options: BuildOptions,
    /// Directory holding `phovea_product.json`; relative paths resolve here.
    pub project_root: PathBuf,
    /// Product name without the `_product` suffix.
    pub product_name: String,
    /// Product version with the build id applied.
    pub version: String,
    /// Scaffolding generator executable.
    pub generator: String,
    /// Extra environment for child processes.
    pub env: HashMap<String, String>,
}

impl BuildContext {
    /// Create a context; derives the child environment from `options`.
    pub fn new(
        options: BuildOptions,
        project_root: impl Into<PathBuf>,
        product_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let mut env = HashMap::new();
        if options.skip_tests {
            env.insert(SKIP_TESTS_VAR.to_string(), "true".to_string());
        }
        Self {
            options,
            project_root: project_root.into(),
            product_name: product_name.into(),
            version: version.into(),
            generator: "yo".to_string(),
            env,
        }
    }

    /// Use a different generator executable.
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = generator.into();
        self
    }

    /// Resolve a path relative to the project root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_root.join(relative)
    }

    /// The shared `build/` output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.path("build")
    }
}
