//! TTY-aware spinner for the one long-running step every command has:
//! waiting on the forge while the Loader's worker pool fans out across
//! repositories. Falls back to plain status lines when stdout isn't a TTY.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

pub fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub struct ProgressReporter {
    is_tty: bool,
    bar: Option<ProgressBar>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let is_tty = is_tty();
        let bar = if is_tty {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        Self {
            is_tty,
            bar,
            start_time: Instant::now(),
        }
    }

    pub fn silent() -> Self {
        Self {
            is_tty: false,
            bar: None,
            start_time: Instant::now(),
        }
    }

    pub fn set_status(&self, status: &str) {
        if self.is_tty {
            if let Some(bar) = &self.bar {
                bar.set_message(status.to_string());
            }
        } else {
            eprintln!("[status] {status}");
        }
    }

    pub fn finish(self, summary: &str) {
        let elapsed = self.start_time.elapsed();
        if self.is_tty {
            if let Some(bar) = self.bar {
                bar.finish_with_message(format!("{summary} ({elapsed:?})"));
            }
        } else {
            eprintln!("{summary} ({elapsed:?})");
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_tty_returns_a_bool() {
        let result = is_tty();
        assert!(matches!(result, true | false));
    }

    #[test]
    fn silent_reporter_disables_tty() {
        let reporter = ProgressReporter::silent();
        assert!(!reporter.is_tty);
        assert!(reporter.bar.is_none());
    }

    #[test]
    fn set_status_and_finish_do_not_panic_in_silent_mode() {
        let reporter = ProgressReporter::silent();
        reporter.set_status("fetching acme...");
        reporter.finish("done");
    }
}
