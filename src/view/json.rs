//! Machine-readable view: one JSON object per line.

use super::ViewAdapter;
use crate::notification::JobFailure;
use crate::progress::ProgressState;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

/// Events emitted by [`JsonView`].
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent<'a> {
    Shown,
    Progress {
        percent: u8,
        progress: Option<f64>,
        valuemin: Option<f64>,
        valuemax: Option<f64>,
        message: Option<&'a str>,
    },
    Failure {
        message: &'a str,
        traceback: Option<&'a str>,
    },
    Timeout {
        waited_ms: u128,
    },
    Teardown,
}

#[derive(Serialize)]
struct Envelope<'a> {
    uuid: &'a str,
    timestamp: String,
    #[serde(flatten)]
    event: ViewEvent<'a>,
}

/// Writes every view event as a JSON line, for scripts driving `jobwatch`.
pub struct JsonView {
    out: Box<dyn Write + Send>,
    uuid: String,
}

impl JsonView {
    pub fn new(uuid: &str, out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            uuid: uuid.to_string(),
        }
    }

    pub fn stdout(uuid: &str) -> Self {
        Self::new(uuid, Box::new(std::io::stdout()))
    }

    fn emit(&mut self, event: ViewEvent<'_>) {
        let envelope = Envelope {
            uuid: &self.uuid,
            timestamp: chrono::Utc::now().to_rfc3339(),
            event,
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                let _ = writeln!(self.out, "{}", json);
                let _ = self.out.flush();
            }
            Err(e) => tracing::warn!("Failed to serialize view event: {}", e),
        }
    }
}

#[async_trait]
impl ViewAdapter for JsonView {
    async fn show(&mut self) {
        self.emit(ViewEvent::Shown);
    }

    fn update_view(&mut self, state: &ProgressState) {
        self.emit(ViewEvent::Progress {
            percent: state.percent(),
            progress: state.progress(),
            valuemin: state.valuemin(),
            valuemax: state.valuemax(),
            message: state.message(),
        });
    }

    fn show_failure(&mut self, failure: &JobFailure) {
        self.emit(ViewEvent::Failure {
            message: &failure.message,
            traceback: failure.traceback.as_deref(),
        });
    }

    fn warn_timeout(&mut self, waited: Duration) {
        self.emit(ViewEvent::Timeout {
            waited_ms: waited.as_millis(),
        });
    }

    fn teardown(&mut self) {
        self.emit(ViewEvent::Teardown);
    }
}
