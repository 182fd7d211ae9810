//! Build configuration: input files, run options and resolved products.
//!
//! - Schema definitions in [`schema`]
//! - File loading in [`loader`]
//! - The compose overlay in [`patch`]
//! - Default filling in [`resolved`]
//! - Run flags and task context in [`options`]
//!
//! # Example
//!
//! ```
//! use phovea_build::config::{resolve_products, ComposePatch, ProductDescriptor};
//!
//! let descs: Vec<ProductDescriptor> =
//!     serde_json::from_str(r#"[{"type": "web", "repo": "Caleydo/ordino"}]"#).unwrap();
//! let mut patch = ComposePatch::default();
//! let products = resolve_products(&descs, &mut patch, "demo", "1.0.0", false).unwrap();
//! assert_eq!(products[0].image, "demo:1.0.0");
//! ```

pub mod loader;
pub mod options;
pub mod patch;
pub mod resolved;
pub mod schema;

pub use loader::{
    build_id, find_patch_file, load_manifest, load_patch, load_products, ProductIdentity,
    PACKAGE_FILE, PRODUCT_FILE,
};
pub use options::{BuildContext, BuildOptions, SKIP_TESTS_VAR};
pub use patch::ComposePatch;
pub use resolved::{
    image_repository, resolve_products, DataSource, RepoSpec, ResolvedProduct, DATA_BUCKET_URL,
};
pub use schema::{
    DataDescriptor, PackageManifest, ProductDescriptor, ProductType, RepoDescriptor,
};
