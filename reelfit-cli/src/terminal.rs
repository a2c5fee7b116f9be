// ============================================================================
// reelfit-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI components and styling
//
// Visual hierarchy used by the commands:
//
// 1. Sections (===== SECTION =====) for major phases
// 2. Processing steps (» Step description)
// 3. Status items (  Label:          Value)
// 4. Success / error lines (✓ Done, ✗ Failed)
//
// Everything goes through the `log` macros so the run log file receives the
// same lines as the console.

use console::style;
use log::{error, info};

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROGRESS_SYMBOL: &str = "⧖";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
    pub const LABEL_WIDTH: usize = 15;

    pub const PROGRESS_CHARS: &str = "##.";
}

/// Print a section header for major workflow phases.
pub fn print_section(title: &str) {
    info!("");
    info!(
        "{}{}{}",
        styling::SECTION_PREFIX,
        style(title.to_uppercase()).cyan().bold(),
        styling::SECTION_SUFFIX
    );
    info!("");
}

/// Formats a label/value pair with the label padded to a fixed column.
pub fn format_status(label: &str, value: &str) -> String {
    let padding = styling::LABEL_WIDTH.saturating_sub(label.len()).max(1);
    format!("{}{}:{}{}", styling::STATUS_INDENT, label, " ".repeat(padding), value)
}

/// Print a status line (key-value pair). `highlight` makes the value bold.
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if highlight {
        info!("{}", format_status(label, &style(value).bold().to_string()));
    } else {
        info!("{}", format_status(label, value));
    }
}

pub fn print_success(message: &str) {
    info!("{}{} {}", styling::STATUS_INDENT, style(styling::SUCCESS_SYMBOL).green(), message);
}

pub fn print_processing(message: &str) {
    info!("{} {}", style(styling::PROCESSING_SYMBOL).cyan(), message);
}

/// Print a line for work that stopped before finishing (cancellation).
pub fn print_interrupted(message: &str) {
    info!("{}{} {}", styling::STATUS_INDENT, style(styling::PROGRESS_SYMBOL).yellow(), message);
}

pub fn print_error(title: &str, message: &str) {
    error!("{} {}: {}", style(styling::ERROR_SYMBOL).red().bold(), title, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_are_aligned() {
        assert_eq!(format_status("Clips", "3"), "  Clips:          3");
        assert_eq!(format_status("Duration", "1m 5s"), "  Duration:       1m 5s");
        // Long labels still keep one space before the value
        assert_eq!(format_status("A very long label here", "x"), "  A very long label here: x");
    }
}
