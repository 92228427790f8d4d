//! Terminal spinner shown while repositories are being resolved.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner that is hidden entirely when progress output is disabled or
/// stderr is not a terminal.
#[derive(Clone)]
pub struct Spinner {
    inner: ProgressBar,
}

impl Spinner {
    pub fn new(enabled: bool) -> Self {
        let inner = if enabled {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]));
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            inner,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Print a line above the spinner without garbling it.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.inner.is_hidden() || self.inner.is_finished() {
            println!("{}", line.as_ref());
        } else {
            self.inner.println(line.as_ref());
        }
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}
