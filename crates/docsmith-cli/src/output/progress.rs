//! Progress display utilities

use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;

/// Progress display for the harvesting stage.
pub struct ProgressDisplay;

impl ProgressDisplay {
    /// Progress bar counting harvested pages, or a hidden one when stderr is
    /// not a terminal or `quiet` is set.
    ///
    /// The length is set from the first progress report.
    pub fn pages(quiet: bool) -> ProgressBar {
        if quiet || !std::io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Callback that feeds `(completed, total)` reports into `pb`.
    pub fn callback(pb: &ProgressBar) -> impl Fn(usize, usize) + Send + Sync + 'static {
        let pb = pb.clone();
        move |completed, total| {
            pb.set_length(u64::try_from(total).unwrap_or(u64::MAX));
            pb.set_position(u64::try_from(completed).unwrap_or(u64::MAX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_updates_bar() {
        let pb = ProgressBar::hidden();
        let cb = ProgressDisplay::callback(&pb);
        cb(2, 5);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(5));
    }
}
