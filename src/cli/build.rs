//! The build command.
//!
//! Loads the product inputs, plans the step chain, compiles it and runs it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{
    build_id, load_manifest, load_patch, load_products, resolve_products, BuildContext,
    ProductIdentity,
};
use crate::error::Result;
use crate::product::BuildPlan;
use crate::runner::{compile, describe_chain, run_with_handler};
use crate::ui::{render_steps, should_use_colors, BuildTheme};

use super::args::Cli;

/// Generator metadata of the project itself.
pub const YO_RC_FILE: &str = ".yo-rc.json";

/// Name `.yo-rc.json` is moved to while building.
pub const YO_RC_STASH: &str = ".yo-rc_tmp.json";

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Moves the project's `.yo-rc.json` out of the way so the generator does
/// not treat the product directory as a workspace. Restored on drop.
#[derive(Debug)]
pub struct YoRcStash {
    original: PathBuf,
    stashed: PathBuf,
    active: bool,
}

impl YoRcStash {
    /// Stash `<root>/.yo-rc.json` if it exists.
    pub fn stash(root: &Path) -> Result<Self> {
        let original = root.join(YO_RC_FILE);
        let stashed = root.join(YO_RC_STASH);
        let active = original.exists();
        if active {
            fs::rename(&original, &stashed)?;
        }
        Ok(Self {
            original,
            stashed,
            active,
        })
    }

    /// Check whether a file was stashed.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for YoRcStash {
    fn drop(&mut self) {
        if self.active && self.stashed.exists() {
            if let Err(err) = fs::rename(&self.stashed, &self.original) {
                warn!("could not restore {}: {}", self.original.display(), err);
            }
        }
    }
}

/// The build command implementation.
pub struct BuildCommand {
    project_root: PathBuf,
    cli: Cli,
}

impl BuildCommand {
    /// Create a new build command.
    pub fn new(project_root: &Path, cli: Cli) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            cli,
        }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn theme(&self) -> BuildTheme {
        BuildTheme::for_terminal(!self.cli.no_color && should_use_colors())
    }

    /// Load the inputs and plan the build.
    pub fn plan(&self) -> Result<BuildPlan> {
        let options = self.cli.build_options();
        if options.skip_tests {
            info!("skipping tests");
        }
        if options.quiet {
            info!("will try to keep my mouth shut...");
        }

        let root = &self.project_root;
        let manifest = load_manifest(root)?;
        let identity = ProductIdentity::from_manifest(&manifest, &build_id(Utc::now()));
        let mut patch = load_patch(root)?;
        let descs = load_products(root)?;
        let specs = resolve_products(
            &descs,
            &mut patch,
            &identity.name,
            &identity.version,
            options.force_label,
        )?;

        let ctx = BuildContext::new(options, root, identity.name, identity.version)
            .with_generator(self.cli.generator.clone());
        let plan = BuildPlan::new(Arc::new(ctx), specs, patch, self.theme());
        if self.cli.steps.is_empty() {
            Ok(plan)
        } else {
            Ok(plan.with_steps(self.cli.steps.iter().cloned()))
        }
    }

    /// Execute the command.
    pub async fn execute(&self) -> Result<CommandResult> {
        let plan = self.plan()?;

        if self.cli.list {
            print!("{}", render_steps(&plan.registry, &plan.chain));
            return Ok(CommandResult::success());
        }

        let _stash = YoRcStash::stash(&self.project_root)?;
        fs::create_dir_all(self.project_root.join("build"))?;

        info!("executing chain: {}", describe_chain(&plan.chain));
        let compiled = match compile(&plan.registry, &plan.chain) {
            Ok(compiled) => compiled,
            Err(err) => {
                error!("{}", err);
                return Ok(CommandResult::failure(1));
            }
        };

        if self.cli.dry_run {
            return Ok(CommandResult::success());
        }

        let (trigger, completion) = run_with_handler(compiled, |err| {
            error!("ERROR extra building {}", err);
        });
        trigger.start();
        let outcome = completion.await;

        if outcome.is_err() || plan.has_failures() {
            Ok(CommandResult::failure(1))
        } else {
            Ok(CommandResult::success())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"name": "demo_product", "version": "1.0.0-SNAPSHOT"}"#,
        )
        .unwrap();
        fs::write(
            temp.path().join("phovea_product.json"),
            r#"[{"type": "web", "label": "web", "repo": "Caleydo/app"}]"#,
        )
        .unwrap();
        temp
    }

    fn command(temp: &TempDir, args: &[&str]) -> BuildCommand {
        let argv = std::iter::once("phovea-build").chain(args.iter().copied());
        BuildCommand::new(temp.path(), Cli::parse_from(argv))
    }

    #[test]
    fn stash_restores_on_drop() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(YO_RC_FILE), "{}").unwrap();

        {
            let stash = YoRcStash::stash(temp.path()).unwrap();
            assert!(stash.is_active());
            assert!(!temp.path().join(YO_RC_FILE).exists());
            assert!(temp.path().join(YO_RC_STASH).exists());
        }

        assert!(temp.path().join(YO_RC_FILE).exists());
        assert!(!temp.path().join(YO_RC_STASH).exists());
    }

    #[test]
    fn stash_without_file_is_inactive() {
        let temp = TempDir::new().unwrap();
        let stash = YoRcStash::stash(temp.path()).unwrap();
        assert!(!stash.is_active());
    }

    #[test]
    fn plan_uses_manifest_identity() {
        let temp = project();
        let plan = command(&temp, &[]).plan().unwrap();

        assert_eq!(plan.products.len(), 1);
        let image = &plan.products[0].spec.image;
        assert!(image.starts_with("demo:1.0.0-"), "{}", image);
        assert!(!image.contains("SNAPSHOT"));
    }

    #[test]
    fn plan_without_product_file_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"name": "demo_product"}"#).unwrap();
        assert!(command(&temp, &[]).plan().is_err());
    }

    #[tokio::test]
    async fn dry_run_compiles_without_running() {
        let temp = project();
        fs::write(temp.path().join(YO_RC_FILE), "{}").unwrap();

        let result = command(&temp, &["--dry-run"]).execute().await.unwrap();

        assert!(result.success);
        assert!(temp.path().join("build").is_dir());
        assert!(temp.path().join(YO_RC_FILE).exists());
        assert!(!temp.path().join("tmp0_app").exists());
    }

    #[tokio::test]
    async fn unknown_step_fails_compilation() {
        let temp = project();
        let result = command(&temp, &["--dry-run", "deploy"]).execute().await.unwrap();
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn explicit_compose_step_writes_compose_file() {
        let temp = project();
        let result = command(&temp, &["compose"]).execute().await.unwrap();

        assert!(result.success);
        let compose = fs::read_to_string(temp.path().join("build/docker-compose.yml")).unwrap();
        assert!(compose.contains("web:"));
    }
}
