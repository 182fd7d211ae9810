//! Visual theme and styling.

use console::Style;

/// Terminal styles for user-facing output.
#[derive(Debug, Clone)]
pub struct BuildTheme {
    /// Style for success markers (green).
    pub success: Style,
    /// Style for error markers (red bold).
    pub error: Style,
    /// Style for headers (bold).
    pub header: Style,
}

impl Default for BuildTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildTheme {
    /// Create the colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            error: Style::new().red().bold(),
            header: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
            header: Style::new(),
        }
    }

    /// Pick the colored or plain theme.
    pub fn for_terminal(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    /// Format a header line.
    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }

    /// Format a success status word.
    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(msg))
    }

    /// Format an error status word.
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(msg))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
