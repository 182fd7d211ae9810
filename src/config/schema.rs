//! Input file schemas.
//!
//! - `package.json` of the product ([`PackageManifest`])
//! - `phovea_product.json`, a list of [`ProductDescriptor`]
//!
//! Descriptor fields are optional; defaults are filled in by
//! [`resolve_products`](super::resolve_products).

use std::fmt;

use serde::Deserialize;

/// The subset of the product's `package.json` the build needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    /// Package name, conventionally `<product>_product`.
    pub name: String,

    /// Package version, may contain `SNAPSHOT`.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.0.1-SNAPSHOT".to_string()
}

/// Kind of deployable a product entry describes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProductType {
    /// Web client bundle served by nginx.
    Web,
    /// Static web content built inside its repository.
    Static,
    /// Python API server.
    Api,
    /// Backend service linked into the API.
    Service,
    /// Anything else; such products are skipped.
    Unknown(String),
}

impl From<String> for ProductType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "web" => ProductType::Web,
            "static" => ProductType::Static,
            "api" => ProductType::Api,
            "service" => ProductType::Service,
            _ => ProductType::Unknown(kind),
        }
    }
}

impl ProductType {
    /// Web or static.
    pub fn is_web(&self) -> bool {
        matches!(self, ProductType::Web | ProductType::Static)
    }

    /// API or service.
    pub fn is_server(&self) -> bool {
        matches!(self, ProductType::Api | ProductType::Service)
    }

    /// Name as written in the descriptor.
    pub fn as_str(&self) -> &str {
        match self {
            ProductType::Web => "web",
            ProductType::Static => "static",
            ProductType::Api => "api",
            ProductType::Service => "service",
            ProductType::Unknown(kind) => kind,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repository reference inside a product descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoDescriptor {
    /// Directory name; defaults to the repository name.
    #[serde(default)]
    pub name: Option<String>,

    /// Repository URL or `org/name` slug; defaults to `phovea/<name>`.
    #[serde(default)]
    pub repo: Option<String>,

    /// Branch to clone; defaults to `master`.
    #[serde(default)]
    pub branch: Option<String>,
}

/// A data package entry, either a bare URL or a detailed object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataDescriptor {
    /// URL or bucket-relative file name.
    Url(String),
    /// Detailed entry.
    Detailed {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        repo: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
}

/// One entry of `phovea_product.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDescriptor {
    /// Product type (`web`, `static`, `api`, `service`).
    #[serde(rename = "type")]
    pub kind: ProductType,

    /// Service label in the compose file.
    #[serde(default)]
    pub label: Option<String>,

    /// Name of the main repository directory.
    #[serde(default)]
    pub name: Option<String>,

    /// Main repository.
    #[serde(default)]
    pub repo: Option<String>,

    /// Branch of the main repository.
    #[serde(default)]
    pub branch: Option<String>,

    /// Extra repositories bundled into the same image.
    #[serde(default)]
    pub additional: Vec<RepoDescriptor>,

    /// Data packages shipped with a server image.
    #[serde(default)]
    pub data: Vec<DataDescriptor>,

    /// Explicit image name, overrides the generated one.
    #[serde(default)]
    pub image: Option<String>,
}
