//! Input file discovery and loading.
//!
//! All inputs live in the project root:
//! - `package.json` (required) - product name and version
//! - `phovea_product.json` (required) - product descriptors
//! - `docker-compose-patch.yaml` / `.yml` (optional) - compose overlay

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::{BuildError, Result};

use super::patch::ComposePatch;
use super::schema::{PackageManifest, ProductDescriptor};

/// Product package manifest file name.
pub const PACKAGE_FILE: &str = "package.json";

/// Product descriptor file name.
pub const PRODUCT_FILE: &str = "phovea_product.json";

/// Compose patch file names, in lookup order.
pub const PATCH_FILES: [&str; 2] = ["docker-compose-patch.yaml", "docker-compose-patch.yml"];

/// Build id derived from a timestamp, `YYYYMMDD-HHMMSS` in UTC.
pub fn build_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Product name and version as used for images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    /// Package name without the `_product` suffix.
    pub name: String,
    /// Version with `SNAPSHOT` replaced by the build id.
    pub version: String,
}

impl ProductIdentity {
    /// Derive the identity from a manifest and a build id.
    pub fn from_manifest(manifest: &PackageManifest, build_id: &str) -> Self {
        Self {
            name: manifest.name.replacen("_product", "", 1),
            version: manifest.version.replacen("SNAPSHOT", build_id, 1),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(BuildError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| BuildError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load `package.json` from the project root.
pub fn load_manifest(project_root: &Path) -> Result<PackageManifest> {
    read_json(&project_root.join(PACKAGE_FILE))
}

/// Load `phovea_product.json` from the project root.
pub fn load_products(project_root: &Path) -> Result<Vec<ProductDescriptor>> {
    read_json(&project_root.join(PRODUCT_FILE))
}

/// Find the compose patch file, if any.
pub fn find_patch_file(project_root: &Path) -> Option<PathBuf> {
    PATCH_FILES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.exists())
}

/// Load the compose patch; a missing or empty file yields an empty patch.
pub fn load_patch(project_root: &Path) -> Result<ComposePatch> {
    let Some(path) = find_patch_file(project_root) else {
        return Ok(ComposePatch::default());
    };
    let content = fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(ComposePatch::default());
    }
    ComposePatch::parse(&content).map_err(|e| BuildError::ConfigParseError {
        path,
        message: e.to_string(),
    })
}
