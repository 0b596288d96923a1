//! `jobwatch report`: the worker side, posting one notification.

use anyhow::{Context, Result};
use console::style;
use jobwatch::channel::report_notification;
use jobwatch::config::JobwatchConfig;
use jobwatch::job::{NextAction, progress_channel};
use jobwatch::notification::{JobFailure, Notification};

/// What to report.
#[derive(Debug, Clone)]
pub enum ReportKind {
    Progress {
        progress: Option<f64>,
        valuemin: Option<f64>,
        valuemax: Option<f64>,
        message: Option<String>,
    },
    Success {
        result: Option<String>,
    },
    Failure {
        message: String,
        traceback: Option<String>,
    },
}

impl ReportKind {
    /// Bounds are only sent as a pair with `valuemin < valuemax`.
    pub fn into_notification(self) -> Notification {
        match self {
            ReportKind::Progress {
                progress,
                valuemin,
                valuemax,
                message,
            } => {
                let (valuemin, valuemax) = match (valuemin, valuemax) {
                    (Some(min), Some(max)) if min < max => (Some(min), Some(max)),
                    _ => (None, None),
                };
                Notification::Progress {
                    progress,
                    valuemin,
                    valuemax,
                    message,
                }
            }
            ReportKind::Success { result } => Notification::Success {
                result: result.as_deref().map(NextAction::parse_arg),
            },
            ReportKind::Failure { message, traceback } => {
                Notification::Failure(JobFailure { message, traceback })
            }
        }
    }
}

pub async fn cmd_report(
    config: &JobwatchConfig,
    url: &str,
    uuid: &str,
    kind: ReportKind,
) -> Result<()> {
    let channel = progress_channel(&config.monitor.namespace, uuid);
    let notification = kind.into_notification();
    let delivered = report_notification(url, &channel, &notification)
        .await
        .with_context(|| format!("Failed to report to {}", url))?;

    println!(
        "Delivered to {} subscriber(s) on {}",
        delivered,
        style(&channel).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_drops_inverted_bounds() {
        let n = ReportKind::Progress {
            progress: Some(5.0),
            valuemin: Some(10.0),
            valuemax: Some(0.0),
            message: None,
        }
        .into_notification();
        assert_eq!(
            n,
            Notification::Progress {
                progress: Some(5.0),
                valuemin: None,
                valuemax: None,
                message: None,
            }
        );
    }

    #[test]
    fn test_success_result_parsed_as_json_or_text() {
        let n = ReportKind::Success {
            result: Some(r#"{"type":"report"}"#.to_string()),
        }
        .into_notification();
        let Notification::Success { result: Some(next) } = n else {
            panic!("expected success with result");
        };
        assert_eq!(next.as_value()["type"], "report");

        let n = ReportKind::Success {
            result: Some("Invoices".to_string()),
        }
        .into_notification();
        assert_eq!(
            n,
            Notification::Success {
                result: Some(NextAction::from("Invoices"))
            }
        );
    }
}
