//! Product descriptors with all defaults filled in.

use std::path::PathBuf;

use crate::error::{BuildError, Result};
use crate::repo::from_repo_url;

use super::patch::ComposePatch;
use super::schema::{DataDescriptor, ProductDescriptor, ProductType, RepoDescriptor};

/// Organization used when a repository only has a name.
pub const DEFAULT_REPO_ORGANIZATION: &str = "phovea";

/// Branch cloned when none is given.
pub const DEFAULT_BRANCH: &str = "master";

/// A repository to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Directory name inside the workspace.
    pub name: String,
    /// Repository URL or slug.
    pub repo: String,
    /// Branch to clone.
    pub branch: String,
}

impl RepoSpec {
    /// Fill defaults from optional name/repo/branch.
    pub fn resolve(
        name: Option<&str>,
        repo: Option<&str>,
        branch: Option<&str>,
    ) -> Result<Self> {
        let name = match (name, repo) {
            (Some(name), _) => name.to_string(),
            (None, Some(repo)) => from_repo_url(repo),
            (None, None) => {
                return Err(BuildError::ConfigValidationError {
                    message: "repository entry needs a name or a repo".to_string(),
                })
            }
        };
        let repo = repo
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", DEFAULT_REPO_ORGANIZATION, name));
        Ok(Self {
            name,
            repo,
            branch: branch.unwrap_or(DEFAULT_BRANCH).to_string(),
        })
    }
}

impl TryFrom<&RepoDescriptor> for RepoSpec {
    type Error = BuildError;

    fn try_from(desc: &RepoDescriptor) -> Result<Self> {
        RepoSpec::resolve(
            desc.name.as_deref(),
            desc.repo.as_deref(),
            desc.branch.as_deref(),
        )
    }
}

/// Bucket holding data packages referenced by file name only.
pub const DATA_BUCKET_URL: &str = "https://s3.eu-central-1.amazonaws.com/phovea-data-packages";

/// A data package to ship with a server image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Download `url` into a file called `name`.
    Url { url: String, name: String },
    /// Clone a repository and copy its `data` directory.
    Repo(RepoSpec),
    /// Unsupported entry type; skipped with an error log.
    Unknown { kind: String },
}

impl DataSource {
    /// Resolve a descriptor entry.
    pub fn resolve(desc: &DataDescriptor) -> Result<Self> {
        match desc {
            DataDescriptor::Url(url) => Ok(Self::from_url(url, None)),
            DataDescriptor::Detailed {
                kind,
                url,
                repo,
                name,
                branch,
            } => {
                let kind = kind.clone().unwrap_or_else(|| {
                    if url.is_some() {
                        "url".to_string()
                    } else if repo.is_some() {
                        "repo".to_string()
                    } else {
                        "unknown".to_string()
                    }
                });
                match (kind.as_str(), url, repo) {
                    ("url", Some(url), _) => Ok(Self::from_url(url, name.as_deref())),
                    ("repo", _, Some(_)) => Ok(DataSource::Repo(RepoSpec::resolve(
                        name.as_deref(),
                        repo.as_deref(),
                        branch.as_deref(),
                    )?)),
                    _ => Ok(DataSource::Unknown { kind }),
                }
            }
        }
    }

    fn from_url(url: &str, name: Option<&str>) -> Self {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| download_name(url));
        let url = if url.starts_with("http") {
            url.to_string()
        } else {
            format!("{}/{}", DATA_BUCKET_URL, url)
        };
        DataSource::Url { url, name }
    }
}

/// File name a download is stored under.
pub fn download_name(url: &str) -> String {
    if !url.starts_with("http") {
        return url.to_string();
    }
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// A product with all defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    /// Product type.
    pub kind: ProductType,
    /// Main repository directory name.
    pub name: String,
    /// Compose service label.
    pub label: String,
    /// Main repository.
    pub repo: RepoSpec,
    /// Extra repositories.
    pub additional: Vec<RepoSpec>,
    /// Data packages.
    pub data: Vec<DataSource>,
    /// Docker image to build.
    pub image: String,
    /// Replacement for the Dockerfile's `FROM` image.
    pub base_image: Option<String>,
    /// Workspace directory, relative to the project root.
    pub tmp_dir: PathBuf,
}

impl ResolvedProduct {
    /// Image name without its tag.
    pub fn image_repository(&self) -> &str {
        image_repository(&self.image)
    }
}

/// Strip the `:tag` part of an image reference.
pub fn image_repository(image: &str) -> &str {
    match image.rfind(':') {
        Some(idx) if !image[idx..].contains('/') => &image[..idx],
        _ => image,
    }
}

/// Workspace directory hint: `tmp<i>_<first five chars of name>`.
fn tmp_dir_name(index: usize, name: &str) -> String {
    let compact: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(5)
        .collect();
    format!("tmp{}_{}", index, compact)
}

/// Fill in defaults for every descriptor.
///
/// Base images found in `patch` for a product label are moved out of the
/// patch into the product.
pub fn resolve_products(
    descs: &[ProductDescriptor],
    patch: &mut ComposePatch,
    product_name: &str,
    version: &str,
    force_label: bool,
) -> Result<Vec<ResolvedProduct>> {
    let single_service = descs.len() == 1 && !force_label;

    descs
        .iter()
        .enumerate()
        .map(|(i, desc)| -> Result<ResolvedProduct> {
            let name = desc
                .name
                .clone()
                .or_else(|| desc.repo.as_deref().map(from_repo_url))
                .or_else(|| desc.label.clone())
                .ok_or_else(|| BuildError::ConfigValidationError {
                    message: format!("product #{} needs a name, repo or label", i),
                })?;
            let label = desc.label.clone().unwrap_or_else(|| name.clone());

            let image = desc.image.clone().unwrap_or_else(|| {
                if single_service {
                    format!("{}:{}", product_name, version)
                } else {
                    format!("{}/{}:{}", product_name, label, version)
                }
            });

            let repo = RepoSpec::resolve(
                Some(&name),
                desc.repo.as_deref(),
                desc.branch.as_deref(),
            )?;
            let additional = desc
                .additional
                .iter()
                .map(RepoSpec::try_from)
                .collect::<Result<Vec<_>>>()?;
            let data = desc
                .data
                .iter()
                .map(DataSource::resolve)
                .collect::<Result<Vec<_>>>()?;

            Ok(ResolvedProduct {
                kind: desc.kind.clone(),
                base_image: patch.take_service_image(&label),
                tmp_dir: PathBuf::from(tmp_dir_name(i, &name)),
                name,
                label,
                repo,
                additional,
                data,
                image,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descs(json: &str) -> Vec<ProductDescriptor> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn single_product_image_has_no_label() {
        let descs = descs(r#"[{"type": "web", "repo": "Caleydo/ordino"}]"#);
        let mut patch = ComposePatch::default();
        let products = resolve_products(&descs, &mut patch, "demo", "1.0.0", false).unwrap();

        let p = &products[0];
        assert_eq!(p.name, "ordino");
        assert_eq!(p.label, "ordino");
        assert_eq!(p.image, "demo:1.0.0");
        assert_eq!(p.repo.branch, "master");
        assert_eq!(p.tmp_dir, PathBuf::from("tmp0_ordin"));
    }

    #[test]
    fn force_label_adds_label_to_single_image() {
        let descs = descs(r#"[{"type": "web", "label": "web", "repo": "Caleydo/ordino"}]"#);
        let mut patch = ComposePatch::default();
        let products = resolve_products(&descs, &mut patch, "demo", "1.0.0", true).unwrap();
        assert_eq!(products[0].image, "demo/web:1.0.0");
    }

    #[test]
    fn several_products_are_labelled() {
        let descs = descs(
            r#"[
                {"type": "web", "label": "web", "repo": "Caleydo/ordino"},
                {"type": "api", "label": "api", "name": "tdp_core", "branch": "develop"}
            ]"#,
        );
        let mut patch = ComposePatch::default();
        let products = resolve_products(&descs, &mut patch, "demo", "2.0.0", false).unwrap();

        assert_eq!(products[0].image, "demo/web:2.0.0");
        assert_eq!(products[1].image, "demo/api:2.0.0");
        assert_eq!(products[1].repo.repo, "phovea/tdp_core");
        assert_eq!(products[1].repo.branch, "develop");
        assert_eq!(products[1].tmp_dir, PathBuf::from("tmp1_tdp_c"));
    }

    #[test]
    fn base_image_moves_out_of_patch() {
        let descs = descs(r#"[{"type": "api", "label": "api", "name": "server"}]"#);
        let mut patch = ComposePatch::parse(
            "services:\n  api:\n    image: python:3.7\n    mem_limit: 1g\n",
        )
        .unwrap();
        let products = resolve_products(&descs, &mut patch, "demo", "1.0.0", false).unwrap();

        assert_eq!(products[0].base_image.as_deref(), Some("python:3.7"));
        let service = patch.service("api").unwrap();
        assert!(service.get("image").is_none());
        assert_eq!(service["mem_limit"], "1g");
    }

    #[test]
    fn name_falls_back_to_label() {
        let descs = descs(r#"[{"type": "service", "label": "my db"}]"#);
        let mut patch = ComposePatch::default();
        let products = resolve_products(&descs, &mut patch, "demo", "1.0.0", false).unwrap();
        assert_eq!(products[0].name, "my db");
        assert_eq!(products[0].tmp_dir, PathBuf::from("tmp0_mydb"));
    }

    #[test]
    fn nameless_product_is_rejected() {
        let descs = descs(r#"[{"type": "web"}]"#);
        let mut patch = ComposePatch::default();
        assert!(resolve_products(&descs, &mut patch, "demo", "1.0.0", false).is_err());
    }

    #[test]
    fn data_sources_resolve() {
        let url = DataSource::resolve(&DataDescriptor::Url("genes.tar.gz".into())).unwrap();
        assert_eq!(
            url,
            DataSource::Url {
                url: format!("{}/genes.tar.gz", DATA_BUCKET_URL),
                name: "genes.tar.gz".into()
            }
        );

        let full = DataSource::resolve(&DataDescriptor::Url("https://x.org/a/b.csv".into())).unwrap();
        assert!(matches!(full, DataSource::Url { ref name, .. } if name == "b.csv"));

        let repo = DataSource::resolve(&DataDescriptor::Detailed {
            kind: None,
            url: None,
            repo: Some("Caleydo/demo_data".into()),
            name: None,
            branch: None,
        })
        .unwrap();
        assert!(matches!(repo, DataSource::Repo(ref r) if r.name == "demo_data"));

        let unknown = DataSource::resolve(&DataDescriptor::Detailed {
            kind: Some("ftp".into()),
            url: None,
            repo: None,
            name: None,
            branch: None,
        })
        .unwrap();
        assert_eq!(unknown, DataSource::Unknown { kind: "ftp".into() });
    }

    #[test]
    fn image_repository_strips_tag() {
        assert_eq!(image_repository("demo/web:1.0.0"), "demo/web");
        assert_eq!(image_repository("registry:5000/demo/web"), "registry:5000/demo/web");
        assert_eq!(image_repository("demo"), "demo");
    }
}
