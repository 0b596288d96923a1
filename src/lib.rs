//! Client-side monitor for long-running background jobs.
//!
//! A job runs somewhere else and reports progress on a named channel. A
//! [`monitor::JobMonitor`] merges those reports into a sane percentage, races
//! the job's end against a timeout, and settles exactly once: success, failure
//! or give-up.

pub mod channel;
pub mod config;
pub mod errors;
pub mod host;
pub mod job;
pub mod logging;
pub mod monitor;
pub mod navigator;
pub mod notification;
pub mod progress;
pub mod race;
pub mod registry;
pub mod schedule;
pub mod timer;
pub mod view;

pub use host::{Host, WAIT_FOR_BACKGROUND_JOB};
pub use job::{Job, NextAction};
pub use monitor::{JobMonitor, MonitorOutcome, MonitorPhase, TerminalState};
pub use notification::Notification;
pub use progress::ProgressState;
