//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `wait`     | `Wait`           |
//! | `simulate` | `Simulate`       |
//! | `report`   | `Report`         |
//! | `channel`  | `Channel`        |
//! | `config`   | `Config`         |
//!
//! `wait` and `simulate` share [`print_outcome`] and [`exit_code`].

pub mod channel;
pub mod config;
pub mod report;
pub mod simulate;
pub mod wait;

pub use channel::cmd_channel;
pub use config::cmd_config;
pub use report::{ReportKind, cmd_report};
pub use simulate::{SimulateOptions, cmd_simulate};
pub use wait::cmd_wait;

use anyhow::{Context, Result};
use console::style;
use jobwatch::monitor::{MonitorOutcome, TerminalState};
use jobwatch::view::UiMode;
use jobwatch::view::icons::{CHECK, CROSS, WARNING};
use std::process::ExitCode;

/// 0 on success, 1 when the job failed, 2 when we stopped waiting.
pub fn exit_code(terminal: &TerminalState) -> ExitCode {
    match terminal {
        TerminalState::Succeeded => ExitCode::SUCCESS,
        TerminalState::Failed(_) => ExitCode::from(1),
        TerminalState::TimedOut | TerminalState::Cancelled => ExitCode::from(2),
    }
}

/// Print the final outcome on stdout, as JSON in JSON mode.
pub fn print_outcome(mode: UiMode, outcome: &MonitorOutcome, trail: &[String]) -> Result<()> {
    if mode == UiMode::Json {
        let event = serde_json::json!({
            "event": "outcome",
            "outcome": outcome,
            "trail": trail,
        });
        let line = serde_json::to_string(&event).context("Failed to serialize outcome")?;
        println!("{}", line);
        return Ok(());
    }

    match &outcome.terminal {
        TerminalState::Succeeded => {
            println!(
                "{}Job {} succeeded",
                CHECK,
                style(&outcome.uuid).yellow()
            );
        }
        TerminalState::Failed(failure) => {
            println!(
                "{}Job {} failed: {}",
                CROSS,
                style(&outcome.uuid).yellow(),
                failure.message
            );
        }
        TerminalState::TimedOut => {
            println!(
                "{}Gave up on job {} after {}s",
                WARNING,
                style(&outcome.uuid).yellow(),
                outcome.elapsed.as_secs()
            );
        }
        TerminalState::Cancelled => {
            println!("Stopped watching job {}", style(&outcome.uuid).yellow());
        }
    }

    println!(
        "  {} {}% after {} notification(s) in {:.1}s",
        style("progress:").dim(),
        outcome.progress.percent(),
        outcome.notifications,
        outcome.elapsed.as_secs_f64()
    );
    if let Some(next) = &outcome.next_action {
        println!("  {} {}", style("next action:").dim(), next);
    }
    if !trail.is_empty() {
        println!("  {} {}", style("location:").dim(), trail.join(" > "));
    }
    Ok(())
}
