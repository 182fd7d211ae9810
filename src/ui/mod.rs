//! User-facing terminal output.
//!
//! Diagnostics go through `tracing`; this module only renders the reports a
//! user reads directly: the build summary and the step listing.

pub mod summary;
pub mod theme;

pub use summary::{render_steps, render_summary, ProductOutcome};
pub use theme::{should_use_colors, BuildTheme};
