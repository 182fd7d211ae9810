//! Plain-text reports: the build summary and the step listing.

use crate::runner::{describe_chain, StepEntry, StepRegistry};

use super::theme::BuildTheme;

/// Outcome of one product, as shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOutcome {
    /// Product name.
    pub name: String,
    /// Recorded failure, if any.
    pub failure: Option<String>,
}

/// Render `name....SUCCESS|ERROR` lines, dots aligned to the longest name.
pub fn render_summary(outcomes: &[ProductOutcome], theme: &BuildTheme) -> String {
    let width = outcomes
        .iter()
        .map(|o| o.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = theme.format_header("summary: ");
    out.push('\n');
    for outcome in outcomes {
        let dots = ".".repeat(3 + width - outcome.name.chars().count());
        let status = if outcome.failure.is_some() {
            theme.format_error("ERROR")
        } else {
            theme.format_success("SUCCESS")
        };
        out.push_str(&format!(" {}{}{}\n", outcome.name, dots, status));
    }
    out
}

/// Render primary steps, secondary (`:`-qualified) steps and the default
/// chain, each section sorted by name.
pub fn render_steps(registry: &StepRegistry, chain: &[StepEntry]) -> String {
    let mut primary: Vec<&str> = registry.names().filter(|n| !n.contains(':')).collect();
    let mut secondary: Vec<&str> = registry.names().filter(|n| n.contains(':')).collect();
    primary.sort_unstable();
    secondary.sort_unstable();

    let mut out = String::new();
    out.push_str("possible primary steps:\n");
    for name in primary {
        out.push_str(&format!("  {}\n", name));
    }
    out.push_str("possible secondary steps:\n");
    for name in secondary {
        out.push_str(&format!("  {}\n", name));
    }
    out.push_str("default chain:\n");
    out.push_str(&describe_chain(chain));
    out.push('\n');
    out
}
