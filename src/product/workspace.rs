//! Workspace preparation.
//!
//! After the generator has created a product workspace, it is adjusted with
//! files from the project root:
//!
//! - `docker_script.sh` is prepended to the workspace's script
//! - the workspace `package.json` receives a version
//! - `phovea.js` is registered as the `__product` plugin
//! - `templates/<type>` files are copied over the workspace

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::{BuildContext, ResolvedProduct};
use crate::error::Result;

use super::fs::copy_dir;

/// Script run inside the image build, extended from the project root.
pub const DOCKER_SCRIPT: &str = "docker_script.sh";

/// Product-level plugin registered into every workspace.
pub const PRODUCT_PLUGIN: &str = "phovea.js";

/// Plugin registry of a workspace.
pub const REGISTRY_FILE: &str = "phovea_registry.js";

/// Directory of per-type template files.
pub const TEMPLATES_DIR: &str = "templates";

/// Generator metadata of a cloned repository.
pub const YO_RC_FILE: &str = ".yo-rc.json";

const REGISTER_SNIPPET: &str = "\n\nimport {register} from 'phovea_core/src/plugin';\nregister('__product', require('./phovea.js'));\n";

/// Prepend the project's `docker_script.sh` to the workspace's one.
///
/// Returns `false` when the project has no such script.
pub fn prepend_docker_script(root: &Path, workspace: &Path) -> Result<bool> {
    let source = root.join(DOCKER_SCRIPT);
    if !source.exists() {
        return Ok(false);
    }
    info!("patch workspace and prepend {}", DOCKER_SCRIPT);
    let mut content = fs::read_to_string(&source)?;
    let target = workspace.join(DOCKER_SCRIPT);
    if target.exists() {
        content.push('\n');
        content.push_str(&fs::read_to_string(&target)?);
    }
    fs::write(target, content)?;
    Ok(true)
}

/// Write `version` into the `package.json` at `package_file`.
///
/// A missing file is logged and reported as `false`.
pub fn inject_version(package_file: &Path, version: &str) -> Result<bool> {
    if !package_file.exists() {
        warn!("Cannot inject version: {} not found", package_file.display());
        return Ok(false);
    }
    let mut package: Value = serde_json::from_str(&fs::read_to_string(package_file)?)?;
    if let Value::Object(fields) = &mut package {
        fields.insert("version".to_string(), Value::String(version.to_string()));
    }
    info!("Write version {} into {}", version, package_file.display());
    fs::write(package_file, serde_json::to_string_pretty(&package)? + "\n")?;
    Ok(true)
}

/// Version of the default application cloned into the workspace.
pub fn default_app_version(workspace: &Path, app: &str) -> Result<Option<String>> {
    let package_file = workspace.join(app).join("package.json");
    if !package_file.exists() {
        warn!(
            "Cannot read version from default app package.json: {} not found",
            package_file.display()
        );
        return Ok(None);
    }
    let package: Value = serde_json::from_str(&fs::read_to_string(package_file)?)?;
    Ok(package
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Copy `phovea.js` into the workspace and register it.
pub fn register_product_plugin(root: &Path, workspace: &Path) -> Result<bool> {
    let source = root.join(PRODUCT_PLUGIN);
    if !source.exists() {
        return Ok(false);
    }
    info!("patch workspace and add workspace {}", PRODUCT_PLUGIN);
    let registry_file = workspace.join(REGISTRY_FILE);
    let mut registry = if registry_file.exists() {
        fs::read_to_string(&registry_file)?
    } else {
        String::new()
    };
    fs::copy(&source, workspace.join(PRODUCT_PLUGIN))?;
    registry.push_str(REGISTER_SNIPPET);
    fs::write(registry_file, registry)?;
    Ok(true)
}

/// Template directory holding deploy files for a label of `kind`.
pub fn label_template_dir(root: &Path, kind: &str, label: &str) -> PathBuf {
    root.join(TEMPLATES_DIR).join(kind).join("deploy").join(label)
}

/// Copy template files for the product into the workspace.
///
/// Label-specific deploy templates win over the generic type templates.
/// Returns the copied directory, if any.
pub fn copy_templates(
    root: &Path,
    workspace: &Path,
    kind: &str,
    label: &str,
) -> Result<Option<PathBuf>> {
    let by_label = label_template_dir(root, kind, label);
    if by_label.is_dir() {
        let target = workspace.join("deploy").join(label);
        info!("Copy deploy files from {} to {}", by_label.display(), target.display());
        copy_dir(&by_label, &target)?;
        return Ok(Some(by_label));
    }

    let by_type = root.join(TEMPLATES_DIR).join(kind);
    if by_type.is_dir() {
        info!("Copy deploy files from {} to {}", by_type.display(), workspace.display());
        copy_dir(&by_type, workspace)?;
        return Ok(Some(by_type));
    }
    Ok(None)
}

/// Apply all project-level adjustments to a freshly generated workspace.
pub fn patch_workspace(ctx: &BuildContext, product: &ResolvedProduct) -> Result<()> {
    let root = &ctx.project_root;
    let workspace = ctx.path(&product.tmp_dir);

    prepend_docker_script(root, &workspace)?;

    let target = workspace.join("package.json");
    if ctx.options.inject_version {
        inject_version(&target, &ctx.version)?;
    } else if let Some(version) = default_app_version(&workspace, &product.name)? {
        inject_version(&target, &version)?;
    }

    register_product_plugin(root, &workspace)?;
    copy_templates(root, &workspace, product.kind.as_str(), &product.label)?;
    Ok(())
}

/// Plugin type of a cloned repository, from its generator metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginType {
    /// Type name such as `lib`, `app`, `lib-slib`.
    pub name: String,
    /// Hybrid client/server plugin (type name contains `-`).
    pub hybrid: bool,
}

impl PluginType {
    /// `npm run` target that builds this plugin's server part.
    pub fn build_script(&self) -> &'static str {
        if self.hybrid {
            "run build:python"
        } else {
            "run build"
        }
    }
}

/// Read `<repo_dir>/.yo-rc.json`; repositories without one are plain `lib`s.
pub fn resolve_plugin_type(repo_dir: &Path) -> Result<PluginType> {
    let file = repo_dir.join(YO_RC_FILE);
    if !file.exists() {
        return Ok(PluginType {
            name: "lib".to_string(),
            hybrid: false,
        });
    }
    let rc: Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    let name = rc
        .pointer("/generator-phovea/type")
        .and_then(Value::as_str)
        .unwrap_or("lib")
        .to_string();
    Ok(PluginType {
        hybrid: name.contains('-'),
        name,
    })
}
