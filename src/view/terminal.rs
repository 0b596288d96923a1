//! Terminal views: an indicatif progress bar and a plain line printer.

use super::icons::{CROSS, HOURGLASS, WARNING};
use super::{
    FAILURE_TITLE, TIMEOUT_MESSAGE, TIMEOUT_TITLE, ViewAdapter, WAITING_MESSAGE, WAITING_TITLE,
};
use crate::notification::JobFailure;
use crate::progress::ProgressState;
use async_trait::async_trait;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold.dim} {spinner} {msg}")
        .expect("progress bar template is a valid static string")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .expect("progress bar template is a valid static string")
        .progress_chars("█▓▒░")
}

/// Modal-style progress display rendered with `indicatif`.
///
/// Shows a spinner until the first numeric progress arrives, then switches to
/// a percentage bar. Failure and timeout notices are printed above the bar
/// area so they survive its removal.
pub struct ProgressBarView {
    multi: MultiProgress,
    bar: Option<ProgressBar>,
    uuid: String,
    verbose: bool,
    showing_bar: bool,
}

impl ProgressBarView {
    pub fn new(uuid: &str, verbose: bool) -> Self {
        Self::with_draw_target(uuid, verbose, ProgressDrawTarget::stderr())
    }

    /// Render to an explicit target; tests pass `ProgressDrawTarget::hidden()`.
    pub fn with_draw_target(uuid: &str, verbose: bool, target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bar: None,
            uuid: uuid.to_string(),
            verbose,
            showing_bar: false,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_shown(&self) -> bool {
        self.bar.is_some()
    }

    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(ProgressBar::position)
    }
}

#[async_trait]
impl ViewAdapter for ProgressBarView {
    async fn show(&mut self) {
        if self.bar.is_some() {
            return;
        }
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(spinner_style());
        bar.set_prefix(WAITING_TITLE);
        bar.set_message(format!("{}{}", HOURGLASS, WAITING_MESSAGE));
        bar.enable_steady_tick(Duration::from_millis(100));
        if self.verbose {
            self.print_line(format!(
                "{} {}",
                style("Watching job").dim(),
                style(&self.uuid).yellow()
            ));
        }
        self.bar = Some(bar);
    }

    fn update_view(&mut self, state: &ProgressState) {
        let Some(bar) = self.bar.as_ref() else {
            return;
        };
        if state.has_bar() && !self.showing_bar {
            bar.set_style(bar_style());
            self.showing_bar = true;
        }
        if state.has_bar() {
            bar.set_position(u64::from(state.percent()));
        }
        if let Some(message) = state.message() {
            bar.set_message(message.to_string());
        }
    }

    fn show_failure(&mut self, failure: &JobFailure) {
        self.print_line(format!(
            "{}{}: {}",
            CROSS,
            style(FAILURE_TITLE).red().bold(),
            failure.message
        ));
        if let Some(traceback) = &failure.traceback {
            for line in traceback.lines() {
                self.print_line(format!("    {}", style(line).dim()));
            }
        }
    }

    fn warn_timeout(&mut self, waited: Duration) {
        self.print_line(format!(
            "{}{} (no result after {}s): {}",
            WARNING,
            style(TIMEOUT_TITLE).yellow().bold(),
            waited.as_secs(),
            TIMEOUT_MESSAGE
        ));
    }

    fn teardown(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

/// Minimal output: one plain line per visible change.
pub struct LineView {
    out: Box<dyn Write + Send>,
    uuid: String,
    last: Option<(u8, Option<String>)>,
}

impl LineView {
    pub fn new(uuid: &str, out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            uuid: uuid.to_string(),
            last: None,
        }
    }

    pub fn stdout(uuid: &str) -> Self {
        Self::new(uuid, Box::new(std::io::stdout()))
    }

    fn line(&mut self, text: String) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

#[async_trait]
impl ViewAdapter for LineView {
    async fn show(&mut self) {
        let text = format!("{}: job {}", WAITING_TITLE, self.uuid);
        self.line(text);
    }

    fn update_view(&mut self, state: &ProgressState) {
        let current = (state.percent(), state.message().map(str::to_string));
        if self.last.as_ref() == Some(&current) {
            return;
        }
        let text = match (state.has_bar(), &current.1) {
            (true, Some(message)) => format!("[{:>3}%] {}", current.0, message),
            (true, None) => format!("[{:>3}%]", current.0),
            (false, Some(message)) => format!("[ .. ] {}", message),
            (false, None) => return,
        };
        self.line(text);
        self.last = Some(current);
    }

    fn show_failure(&mut self, failure: &JobFailure) {
        let text = format!("{}: {}", FAILURE_TITLE, failure.message);
        self.line(text);
        if let Some(traceback) = &failure.traceback {
            let text = traceback.to_string();
            self.line(text);
        }
    }

    fn warn_timeout(&mut self, waited: Duration) {
        let text = format!(
            "{} (no result after {}s): {}",
            TIMEOUT_TITLE,
            waited.as_secs(),
            TIMEOUT_MESSAGE
        );
        self.line(text);
    }

    fn teardown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::testing::SharedBuffer;

    fn hidden_view() -> ProgressBarView {
        ProgressBarView::with_draw_target("abc", false, ProgressDrawTarget::hidden())
    }

    #[tokio::test]
    async fn test_progress_bar_tracks_percent() {
        let mut view = hidden_view();
        assert!(!view.is_shown());

        view.show().await;
        assert!(view.is_shown());

        let state = ProgressState::new().update(Some(10.0), Some(0.0), Some(100.0), None);
        view.update_view(&state);
        assert_eq!(view.position(), Some(10));

        view.teardown();
        assert!(!view.is_shown());
        // A second teardown is harmless
        view.teardown();
    }

    #[tokio::test]
    async fn test_progress_bar_ignores_updates_before_show() {
        let mut view = hidden_view();
        let state = ProgressState::new().update(Some(50.0), Some(0.0), Some(100.0), None);
        view.update_view(&state);
        assert_eq!(view.position(), None);
    }

    #[tokio::test]
    async fn test_line_view_prints_changes_once() {
        let buffer = SharedBuffer::default();
        let mut view = LineView::new("abc", Box::new(buffer.clone()));
        view.show().await;

        let state = ProgressState::new().update(
            Some(10.0),
            Some(0.0),
            Some(100.0),
            Some("starting".to_string()),
        );
        view.update_view(&state);
        view.update_view(&state);

        assert_eq!(buffer.lines(), vec!["Working: job abc", "[ 10%] starting"]);
    }

    #[tokio::test]
    async fn test_line_view_failure_and_timeout() {
        let buffer = SharedBuffer::default();
        let mut view = LineView::new("abc", Box::new(buffer.clone()));
        view.show_failure(&JobFailure {
            message: "m".to_string(),
            traceback: Some("tb".to_string()),
        });
        view.warn_timeout(Duration::from_secs(1200));

        let lines = buffer.lines();
        assert_eq!(lines[0], "Server Error: m");
        assert_eq!(lines[1], "tb");
        assert!(lines[2].starts_with("Ask for help (no result after 1200s)"));
    }
}
