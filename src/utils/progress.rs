use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Terminal progress bar for long per-tile loops
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total: u64, description: &str) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(description.to_string());

        ProgressTracker { bar }
    }

    /// A tracker that never draws
    pub fn hidden(total: u64) -> Self {
        ProgressTracker { bar: ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden()) }
    }

    pub fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_increments() {
        let tracker = ProgressTracker::hidden(10);
        tracker.increment(3);
        tracker.increment(1);
        assert_eq!(tracker.position(), 4);
        tracker.finish();
    }
}
