// Diagnostic logging. Output goes to stderr so it never interleaves with
// menu prompts on stdout; the level is taken from `RUST_LOG`.
//
// While a spinner is on screen, log lines are written with the spinner
// suspended so they land on their own line instead of through the bar.

use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

static ACTIVE_PROGRESS: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// Install the global subscriber. Safe to call once per process; a second
/// call is ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(|| ConsoleWriter))
        .try_init();
}

/// Keeps `bar` registered as the on-screen progress indicator until dropped.
pub struct ProgressGuard {
    bar: ProgressBar,
}

impl ProgressGuard {
    pub fn new(bar: ProgressBar) -> Self {
        if let Ok(mut active) = ACTIVE_PROGRESS.lock() {
            *active = Some(bar.clone());
        }
        ProgressGuard { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        if let Ok(mut active) = ACTIVE_PROGRESS.lock() {
            *active = None;
        }
    }
}

fn active_progress() -> Option<ProgressBar> {
    ACTIVE_PROGRESS.lock().ok().and_then(|active| active.clone())
}

/// stderr writer that steps around any registered progress bar.
struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active_progress() {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_registers_and_clears_the_bar() {
        let bar = ProgressBar::hidden();
        let guard = ProgressGuard::new(bar.clone());
        assert!(active_progress().is_some());
        assert!(ConsoleWriter.write(b"").is_ok());

        drop(guard);
        assert!(active_progress().is_none());
        assert!(bar.is_finished());
    }
}
