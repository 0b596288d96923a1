//! Job identity and channel naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default namespace of the background-job transport.
pub const DEFAULT_NAMESPACE: &str = "celeryapp";

/// Opaque navigation target visited once a job concludes.
///
/// Hosts decide what the value means (an action name, an action descriptor
/// object, a URL). The monitor only stores it and hands it to the navigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NextAction(serde_json::Value);

impl NextAction {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Parse a CLI argument: valid JSON is kept as-is, anything else becomes a string.
    pub fn parse_arg(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => Self(value),
            Err(_) => Self(serde_json::Value::String(raw.to_string())),
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Whether the value names anything to open. `null`, `false`, zero and
    /// the empty string do not; any object or array does, even an empty one.
    pub fn is_actionable(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null | serde_json::Value::Bool(false) => false,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Values that are not [actionable](Self::is_actionable) mean "no next action".
    pub fn from_optional(value: Option<serde_json::Value>) -> Option<Self> {
        value.map(Self).filter(Self::is_actionable)
    }
}

impl From<&str> for NextAction {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::String(value.to_string()))
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Channel carrying progress and terminal notifications for a job.
pub fn progress_channel(namespace: &str, uuid: &str) -> String {
    format!("{}:{}:progress", namespace, uuid)
}

/// Channel carrying status broadcasts for a job. Not observed by the monitor.
pub fn status_channel(namespace: &str, uuid: &str) -> String {
    format!("{}:{}:status", namespace, uuid)
}

/// A server-side job observed by one monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    uuid: String,
    channel_id: String,
    next_action: Option<NextAction>,
}

impl Job {
    /// Create a job in the default transport namespace.
    pub fn new(uuid: impl Into<String>, next_action: Option<NextAction>) -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE, uuid, next_action)
    }

    pub fn with_namespace(
        namespace: &str,
        uuid: impl Into<String>,
        next_action: Option<NextAction>,
    ) -> Self {
        let uuid = uuid.into();
        let channel_id = progress_channel(namespace, &uuid);
        Self {
            uuid,
            channel_id,
            next_action: next_action.filter(NextAction::is_actionable),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn next_action(&self) -> Option<&NextAction> {
        self.next_action.as_ref()
    }

    /// Replace the next action. Only a success notification calls this; a
    /// value that is not actionable leaves the current one in place.
    pub(crate) fn set_next_action(&mut self, next: NextAction) {
        if next.is_actionable() {
            self.next_action = Some(next);
        }
    }
}
