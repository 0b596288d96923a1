//! Presentation of a monitored job.
//!
//! The monitor talks to its view only through [`ViewAdapter`]; it never reads
//! anything back except the readiness signal of [`ViewAdapter::show`].
//!
//! | Mode      | Adapter           | Output                                  |
//! |-----------|-------------------|-----------------------------------------|
//! | `full`    | `ProgressBarView` | indicatif bar with percentage + message |
//! | `minimal` | `LineView`        | one plain line per change               |
//! | `json`    | `JsonView`        | one JSON object per event on stdout     |

use crate::notification::JobFailure;
use crate::progress::ProgressState;
use async_trait::async_trait;
use std::time::Duration;

pub mod icons;
pub mod json;
pub mod terminal;

pub use json::JsonView;
pub use terminal::{LineView, ProgressBarView};

pub const WAITING_TITLE: &str = "Working";
pub const WAITING_MESSAGE: &str =
    "Your request is being processed (or about to be processed). Please wait.";
pub const FAILURE_TITLE: &str = "Server Error";
pub const TIMEOUT_TITLE: &str = "Ask for help";
pub const TIMEOUT_MESSAGE: &str = "You're stuck waiting for a job that is taking far too long. \
     Ask your administrator for help.";

/// Rendering capabilities the monitor needs.
#[async_trait]
pub trait ViewAdapter: Send {
    /// Put the view on screen. Returning is the "ready to display" signal.
    async fn show(&mut self);

    fn update_view(&mut self, state: &ProgressState);

    fn show_failure(&mut self, failure: &JobFailure);

    fn warn_timeout(&mut self, waited: Duration);

    /// Remove the view. Called once, before any deferred failure display.
    fn teardown(&mut self);
}

/// Output mode for job views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Progress bar
    #[default]
    Full,
    /// Single-line status updates
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl std::fmt::Display for UiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiMode::Full => write!(f, "full"),
            UiMode::Minimal => write!(f, "minimal"),
            UiMode::Json => write!(f, "json"),
        }
    }
}

impl UiMode {
    /// Parse UI mode from string (convenience method).
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Whether `s` names a mode, rather than falling back to `full`.
    pub fn is_known(s: &str) -> bool {
        matches!(s.to_lowercase().as_str(), "full" | "minimal" | "json")
    }
}

/// Build the view for `mode`, writing to the terminal.
pub fn build_view(mode: UiMode, uuid: &str, verbose: bool) -> Box<dyn ViewAdapter> {
    match mode {
        UiMode::Full => Box::new(ProgressBarView::new(uuid, verbose)),
        UiMode::Minimal => Box::new(LineView::stdout(uuid)),
        UiMode::Json => Box::new(JsonView::stdout(uuid)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_mode_parse() {
        assert_eq!(UiMode::parse("json"), UiMode::Json);
        assert_eq!(UiMode::parse("MINIMAL"), UiMode::Minimal);
        assert_eq!(UiMode::parse("full"), UiMode::Full);
        assert_eq!(UiMode::parse("fancy"), UiMode::Full);
    }

    #[test]
    fn test_ui_mode_is_known() {
        assert!(UiMode::is_known("Json"));
        assert!(!UiMode::is_known("fancy"));
    }

    #[test]
    fn test_ui_mode_display_round_trips() {
        for mode in [UiMode::Full, UiMode::Minimal, UiMode::Json] {
            assert_eq!(UiMode::parse(&mode.to_string()), mode);
        }
    }
}
