//! Docker Compose assembly.
//!
//! - [`merge`] - Deep merge with sequence union
//! - [`builder`] - Product partials and the final compose document

pub mod builder;
pub mod merge;

pub use builder::{
    build_compose, load_partial, patch_compose_file, product_partial, write_compose,
    HOST_SERVICE, PARTIAL_FILE,
};
pub use merge::{merge_all, merge_with};
