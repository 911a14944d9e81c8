use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while background imports finish. Hidden in quiet mode.
pub struct ImportSpinner {
    bar: ProgressBar,
}

impl ImportSpinner {
    pub fn new(msg: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        // Template is a literal; a bad one only loses the styling.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn finish_success(&self, msg: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✓").green().bold(), msg));
    }

    pub fn finish_error(&self, msg: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✗").red().bold(), msg));
    }

    /// Finish and clear the spinner (for custom summary output).
    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_spinner_is_hidden() {
        let spinner = ImportSpinner::new("importing", true);
        assert!(spinner.is_hidden());
        spinner.finish_clear();
    }
}
