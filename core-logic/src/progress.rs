use crate::traits::ProgressReporter;
use crate::types::ProcessingOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::Color;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Terminal progress bar with a colored pass/fail line per wallet.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn start(&self, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message("checking wallets");
    }

    fn advance(&self, outcome: &ProcessingOutcome, completed: usize, _total: usize) {
        let color = if outcome.success {
            Color::Green
        } else {
            Color::Red
        };
        self.bar.println(format!(
            "Wallet: {}",
            color.paint(outcome.wallet.as_str())
        ));
        self.bar.set_position(completed as u64);
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

/// Reporter that prints nothing.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start(&self, _total: usize) {}

    fn advance(&self, _outcome: &ProcessingOutcome, _completed: usize, _total: usize) {}

    fn finish(&self) {}
}
