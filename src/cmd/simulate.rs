//! `jobwatch simulate`: a scripted job publishing into the in-process bus.

use anyhow::Result;
use jobwatch::config::JobwatchConfig;
use jobwatch::host::{Host, WAIT_FOR_BACKGROUND_JOB};
use jobwatch::navigator::BreadcrumbNavigator;
use jobwatch::notification::{JobFailure, Notification, ProgressReport};
use std::process::ExitCode;
use std::time::Duration;

use super::{exit_code, print_outcome};

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub steps: u32,
    pub fail: bool,
    pub stall: bool,
    pub interval: Duration,
}

/// The notifications a simulated job sends, in order.
pub fn script(options: &SimulateOptions) -> Vec<Notification> {
    let mut notifications = vec![Notification::Progress {
        progress: None,
        valuemin: None,
        valuemax: None,
        message: Some("Queued".to_string()),
    }];

    let total = f64::from(options.steps);
    for step in 1..=options.steps {
        notifications.push(
            ProgressReport::new()
                .progress(f64::from(step))
                .bounds(0.0, total)
                .message(format!("Step {} of {}", step, options.steps))
                .build(),
        );
    }

    if options.stall {
        return notifications;
    }
    if options.fail {
        notifications.push(Notification::Failure(JobFailure {
            message: "Simulated job failure".to_string(),
            traceback: Some(format!(
                "Traceback (most recent call last):\n  step {}\nRuntimeError: simulated",
                options.steps
            )),
        }));
    } else {
        notifications.push(Notification::Success { result: None });
    }
    notifications
}

pub async fn cmd_simulate(config: &JobwatchConfig, options: SimulateOptions) -> Result<ExitCode> {
    let host = Host::new(config.clone());
    let uuid = uuid::Uuid::new_v4().to_string();

    let navigator = BreadcrumbNavigator::new(["jobwatch", "simulate"]);
    let monitor = host.dispatch(
        WAIT_FOR_BACKGROUND_JOB,
        &serde_json::json!({ "uuid": uuid }),
        Box::new(navigator.clone()),
    )?;

    let bus = host.bus().clone();
    let channel = monitor.job().channel_id().to_string();
    let notifications = script(&options);
    let interval = options.interval;
    tracing::debug!(%uuid, count = notifications.len(), "Starting simulated job");
    let worker = tokio::spawn(async move {
        for notification in notifications {
            tokio::time::sleep(interval).await;
            bus.publish(&channel, notification);
        }
    });

    let outcome = monitor.run().await;
    worker.abort();

    print_outcome(config.ui.mode(), &outcome, &navigator.trail())?;
    Ok(exit_code(&outcome.terminal))
}
