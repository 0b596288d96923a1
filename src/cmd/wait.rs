//! `jobwatch wait`: monitor a real job through the callback endpoint.

use anyhow::{Context, Result};
use console::style;
use jobwatch::channel::CallbackServer;
use jobwatch::config::JobwatchConfig;
use jobwatch::host::{Host, WAIT_FOR_BACKGROUND_JOB};
use jobwatch::job::NextAction;
use jobwatch::navigator::BreadcrumbNavigator;
use std::process::ExitCode;

use super::{exit_code, print_outcome};

pub async fn cmd_wait(
    config: &JobwatchConfig,
    uuid: &str,
    next_action: Option<&str>,
) -> Result<ExitCode> {
    let host = Host::new(config.clone());

    let mut server = CallbackServer::new(host.bus().clone());
    let url = server
        .start(config.callback.port)
        .await
        .context("Failed to start callback endpoint")?;

    let params = serde_json::json!({
        "uuid": uuid,
        "next_action": next_action.map(|raw| NextAction::parse_arg(raw).as_value().clone()),
    });
    let navigator = BreadcrumbNavigator::new(["jobwatch", WAIT_FOR_BACKGROUND_JOB]);
    let monitor = host.dispatch(WAIT_FOR_BACKGROUND_JOB, &params, Box::new(navigator.clone()))?;

    // stderr, so stdout stays clean for JSON consumers
    eprintln!("{} {}", style("Callback URL:").bold(), url);
    eprintln!("{} {}", style("Channel:").bold(), monitor.job().channel_id());
    eprintln!(
        "{}",
        style(format!(
            "Report with: jobwatch report {} {} --progress N --valuemin 0 --valuemax 100",
            url, uuid
        ))
        .dim()
    );

    let outcome = monitor.run().await;
    server.stop().await;

    print_outcome(config.ui.mode(), &outcome, &navigator.trail())?;
    Ok(exit_code(&outcome.terminal))
}
