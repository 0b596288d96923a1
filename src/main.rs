use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use jobwatch::config::{CliOverrides, JobwatchConfig, LoggingConfig};
use jobwatch::logging::init_logging;

mod cmd;

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(
    version,
    about = "Watch a long-running background job until it succeeds, fails or times out"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to jobwatch.toml. Defaults to ./.jobwatch/jobwatch.toml, then the user config dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// UI output mode: full, minimal, json
    #[arg(long, global = true)]
    pub ui: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wait for a job, accepting its notifications on a local callback endpoint
    Wait {
        /// Job uuid
        uuid: String,

        /// Where to go once the job succeeds (JSON, or plain text)
        #[arg(long)]
        next_action: Option<String>,

        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Callback port (0 picks a free one)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a scripted job against an in-process monitor
    Simulate {
        /// Number of progress steps before the job settles
        #[arg(long, default_value = "5")]
        steps: u32,

        /// End with a failure instead of success
        #[arg(long, conflicts_with = "stall")]
        fail: bool,

        /// Never settle, so the monitor times out
        #[arg(long)]
        stall: bool,

        /// Delay between notifications
        #[arg(long, default_value = "200")]
        interval_ms: u64,

        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Publish one notification to a waiting `jobwatch wait`
    Report {
        /// Base URL printed by `jobwatch wait`
        url: String,

        /// Job uuid
        uuid: String,

        #[arg(long, allow_negative_numbers = true)]
        progress: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        valuemin: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        valuemax: Option<f64>,

        /// Progress message, or the failure message with --failure
        #[arg(long)]
        message: Option<String>,

        /// Report that the job finished
        #[arg(long, conflicts_with = "failure")]
        success: bool,

        /// Next action carried by --success (JSON, or plain text)
        #[arg(long, requires = "success")]
        result: Option<String>,

        /// Report that the job raised
        #[arg(long)]
        failure: bool,

        #[arg(long, requires = "failure")]
        traceback: Option<String>,
    },
    /// Print the progress channel id of a job
    Channel {
        uuid: String,

        /// Also print the status channel id
        #[arg(long)]
        status: bool,
    },
    /// Show, validate or create jobwatch.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default jobwatch.toml
    Init,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let (timeout_ms, port) = match &self.command {
            Commands::Wait {
                timeout_ms, port, ..
            } => (*timeout_ms, *port),
            Commands::Simulate { timeout_ms, .. } => (*timeout_ms, None),
            _ => (None, None),
        };
        CliOverrides {
            timeout_ms,
            ui: self.ui.clone(),
            port,
            verbose: self.verbose,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Config commands inspect the file themselves, including a broken or missing one
    if let Commands::Config { command } = &cli.command {
        let _guard = init_logging(&LoggingConfig::default(), cli.verbose)?;
        cmd::cmd_config(cli.config.as_deref(), command.clone())?;
        return Ok(ExitCode::SUCCESS);
    }

    let (mut config, _path) = JobwatchConfig::resolve(cli.config.as_deref())?;
    config.apply_cli(&cli.overrides());
    let _guard = init_logging(&config.logging, config.ui.verbose)?;

    let code = match &cli.command {
        Commands::Wait {
            uuid, next_action, ..
        } => cmd::cmd_wait(&config, uuid, next_action.as_deref()).await?,
        Commands::Simulate {
            steps,
            fail,
            stall,
            interval_ms,
            ..
        } => {
            let options = cmd::SimulateOptions {
                steps: *steps,
                fail: *fail,
                stall: *stall,
                interval: std::time::Duration::from_millis(*interval_ms),
            };
            cmd::cmd_simulate(&config, options).await?
        }
        Commands::Report {
            url,
            uuid,
            progress,
            valuemin,
            valuemax,
            message,
            success,
            result,
            failure,
            traceback,
        } => {
            let kind = if *success {
                cmd::ReportKind::Success {
                    result: result.clone(),
                }
            } else if *failure {
                cmd::ReportKind::Failure {
                    message: message.clone().unwrap_or_default(),
                    traceback: traceback.clone(),
                }
            } else {
                cmd::ReportKind::Progress {
                    progress: *progress,
                    valuemin: *valuemin,
                    valuemax: *valuemax,
                    message: message.clone(),
                }
            };
            cmd::cmd_report(&config, url, uuid, kind).await?;
            ExitCode::SUCCESS
        }
        Commands::Channel { uuid, status } => {
            cmd::cmd_channel(&config, uuid, *status);
            ExitCode::SUCCESS
        }
        Commands::Config { .. } => ExitCode::SUCCESS,
    };

    Ok(code)
}
