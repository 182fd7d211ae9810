//! phovea-build - build every repository of a Phovea product into docker images.
//!
//! A product is described by `phovea_product.json`. Each entry names a web
//! or server repository that is cloned, scaffolded into a workspace, built,
//! packaged as a docker image and finally wired into a compose file.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`compose`] - Compose fragment merging
//! - [`config`] - Input files, run options and product resolution
//! - [`error`] - Error types and result aliases
//! - [`product`] - Per-product tasks and the build plan
//! - [`repo`] - Repository URL handling
//! - [`runner`] - Step registry, chain compilation and execution
//! - [`shell`] - External tool invocation
//! - [`ui`] - Themes and textual reports
//!
//! # Example
//!
//! ```
//! use phovea_build::config::{resolve_products, ComposePatch, ProductDescriptor};
//! use phovea_build::runner::StepEntry;
//!
//! let descs: Vec<ProductDescriptor> = serde_json::from_str(
//!     r#"[{"type": "web", "label": "web", "repo": "Caleydo/ordino"},
//!         {"type": "api", "label": "api", "repo": "Caleydo/ordino_server"}]"#,
//! ).unwrap();
//! let products = resolve_products(&descs, &mut ComposePatch::default(), "demo", "2.0.0", false)
//!     .unwrap();
//! assert_eq!(products[1].image, "demo/api:2.0.0");
//!
//! let group = StepEntry::parallel(products.iter().map(|p| format!("build:{}", p.name)));
//! assert_eq!(
//!     group.describe(),
//!     serde_json::json!({"build:ordino": "build:ordino", "build:ordino_server": "build:ordino_server"})
//! );
//! ```

pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod product;
pub mod repo;
pub mod runner;
pub mod shell;
pub mod ui;

pub use error::{BuildError, Result};
