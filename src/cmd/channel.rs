//! `jobwatch channel`: print channel ids for a job.

use jobwatch::config::JobwatchConfig;
use jobwatch::job::{progress_channel, status_channel};

pub fn cmd_channel(config: &JobwatchConfig, uuid: &str, status: bool) {
    println!("{}", progress_channel(&config.monitor.namespace, uuid));
    if status {
        println!("{}", status_channel(&config.monitor.namespace, uuid));
    }
}
