//! Decoding of `(channel, message)` payloads delivered on a job channel.
//!
//! The transport carries loosely typed JSON. Decoding is lenient: a field of
//! the wrong type decodes as absent rather than rejecting the whole payload,
//! so a half-broken progress report still moves the bar.

use crate::errors::NotificationError;
use crate::job::NextAction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Diagnostic detail of a failed job, shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub message: String,
    #[serde(default)]
    pub traceback: Option<String>,
}

/// One message delivered on a job channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Partial progress report; every field may be missing.
    Progress {
        progress: Option<f64>,
        valuemin: Option<f64>,
        valuemax: Option<f64>,
        message: Option<String>,
    },
    /// The job finished; `result` overrides the monitor's next action.
    Success { result: Option<NextAction> },
    /// The job raised.
    Failure(JobFailure),
}

impl Notification {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Progress { .. })
    }

    /// Decode the message half of a payload.
    pub fn from_message(channel: &str, message: &Value) -> Result<Self, NotificationError> {
        let object = message
            .as_object()
            .ok_or_else(|| NotificationError::NotAnObject {
                channel: channel.to_string(),
            })?;

        Ok(match object.get("status").and_then(Value::as_str) {
            Some("success") => Notification::Success {
                result: NextAction::from_optional(object.get("result").cloned()),
            },
            Some("failure") => Notification::Failure(JobFailure {
                message: text_field(object, "message").unwrap_or_default(),
                traceback: text_field(object, "traceback"),
            }),
            // "pending", null or anything unknown is a progress report
            _ => Notification::Progress {
                progress: number_field(object, "progress"),
                valuemin: number_field(object, "valuemin"),
                valuemax: number_field(object, "valuemax"),
                message: text_field(object, "message"),
            },
        })
    }

    /// Decode a full `[channel, message]` pair.
    pub fn from_pair(payload: &Value) -> Result<(String, Self), NotificationError> {
        let (channel, message) = split_pair(payload)?;
        let notification = Self::from_message(&channel, message)?;
        Ok((channel, notification))
    }

    /// Decode a raw request body holding a `[channel, message]` pair.
    pub fn from_body(body: &[u8]) -> Result<(String, Self), NotificationError> {
        let payload: Value = serde_json::from_slice(body)?;
        Self::from_pair(&payload)
    }

    /// Encode into the message half of a payload, as a job worker would send it.
    pub fn to_message(&self) -> Value {
        match self {
            Notification::Progress {
                progress,
                valuemin,
                valuemax,
                message,
            } => serde_json::json!({
                "status": Value::Null,
                "progress": progress,
                "valuemin": valuemin,
                "valuemax": valuemax,
                "message": message,
            }),
            Notification::Success { result } => serde_json::json!({
                "status": "success",
                "result": result,
            }),
            Notification::Failure(failure) => serde_json::json!({
                "status": "failure",
                "message": failure.message,
                "traceback": failure.traceback,
            }),
        }
    }
}

/// Split a `[channel, message]` pair without decoding the message.
pub fn split_pair(payload: &Value) -> Result<(String, &Value), NotificationError> {
    match payload.as_array().map(Vec::as_slice) {
        Some([Value::String(channel), message]) => Ok((channel.clone(), message)),
        _ => Err(NotificationError::NotAPair),
    }
}

fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Message text is not validated: strings pass through, other scalars are
/// rendered, `null` and missing mean "no message".
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Builder for the progress reports a job worker sends.
///
/// Bounds must be reported together and `valuemin < valuemax`; a pair that
/// violates this is dropped before sending, as the client would discard it
/// anyway.
#[derive(Debug, Clone, Default)]
pub struct ProgressReport {
    progress: Option<f64>,
    bounds: Option<(f64, f64)>,
    message: Option<String>,
}

impl ProgressReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn bounds(mut self, valuemin: f64, valuemax: f64) -> Self {
        self.bounds = Some((valuemin, valuemax));
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn build(self) -> Notification {
        let (valuemin, valuemax) = match self.bounds {
            Some((min, max)) if min < max => (Some(min), Some(max)),
            _ => (None, None),
        };
        Notification::Progress {
            progress: self.progress,
            valuemin,
            valuemax,
            message: self.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHANNEL: &str = "celeryapp:abc:progress";

    #[test]
    fn test_decode_progress_without_status() {
        let n = Notification::from_message(
            CHANNEL,
            &json!({"progress": 10, "valuemin": 0, "valuemax": 100, "message": "starting"}),
        )
        .unwrap();
        assert_eq!(
            n,
            Notification::Progress {
                progress: Some(10.0),
                valuemin: Some(0.0),
                valuemax: Some(100.0),
                message: Some("starting".to_string()),
            }
        );
        assert!(!n.is_terminal());
    }

    #[test]
    fn test_decode_pending_status_is_progress() {
        let n = Notification::from_message(CHANNEL, &json!({"status": "pending", "progress": 3}))
            .unwrap();
        assert!(matches!(
            n,
            Notification::Progress {
                progress: Some(p),
                ..
            } if p == 3.0
        ));
    }

    #[test]
    fn test_decode_non_numeric_bounds_as_none() {
        let n = Notification::from_message(
            CHANNEL,
            &json!({"progress": "ten", "valuemin": null, "valuemax": [1], "message": 42}),
        )
        .unwrap();
        assert_eq!(
            n,
            Notification::Progress {
                progress: None,
                valuemin: None,
                valuemax: None,
                message: Some("42".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_success_with_result() {
        let n = Notification::from_message(CHANNEL, &json!({"status": "success", "result": "X"}))
            .unwrap();
        assert_eq!(
            n,
            Notification::Success {
                result: Some(NextAction::from("X"))
            }
        );
        assert!(n.is_terminal());
    }

    #[test]
    fn test_decode_success_null_result_is_none() {
        let n = Notification::from_message(CHANNEL, &json!({"status": "success", "result": null}))
            .unwrap();
        assert_eq!(n, Notification::Success { result: None });
    }

    #[test]
    fn test_decode_failure_without_traceback() {
        let n = Notification::from_message(CHANNEL, &json!({"status": "failure", "message": "m"}))
            .unwrap();
        assert_eq!(
            n,
            Notification::Failure(JobFailure {
                message: "m".to_string(),
                traceback: None,
            })
        );
    }

    #[test]
    fn test_decode_rejects_non_object_message() {
        let err = Notification::from_message(CHANNEL, &json!("done")).unwrap_err();
        assert!(matches!(err, NotificationError::NotAnObject { .. }));
    }

    #[test]
    fn test_decode_pair() {
        let (channel, n) = Notification::from_pair(&json!([
            CHANNEL,
            {"status": "failure", "message": "m", "traceback": "tb"}
        ]))
        .unwrap();
        assert_eq!(channel, CHANNEL);
        assert!(matches!(n, Notification::Failure(ref f) if f.traceback.as_deref() == Some("tb")));
    }

    #[test]
    fn test_decode_pair_rejects_wrong_shape() {
        assert!(matches!(
            Notification::from_pair(&json!({"channel": CHANNEL})),
            Err(NotificationError::NotAPair)
        ));
        assert!(matches!(
            Notification::from_pair(&json!([CHANNEL])),
            Err(NotificationError::NotAPair)
        ));
        assert!(matches!(
            Notification::from_pair(&json!([1, {}])),
            Err(NotificationError::NotAPair)
        ));
    }

    #[test]
    fn test_to_message_decodes_back_to_failure() {
        let failure = Notification::Failure(JobFailure {
            message: "boom".to_string(),
            traceback: Some("Traceback (most recent call last)".to_string()),
        });
        let decoded = Notification::from_message(CHANNEL, &failure.to_message()).unwrap();
        assert_eq!(decoded, failure);
    }

    #[test]
    fn test_progress_report_drops_inverted_bounds() {
        let n = ProgressReport::new().progress(5.0).bounds(10.0, 10.0).build();
        assert!(matches!(
            n,
            Notification::Progress {
                valuemin: None,
                valuemax: None,
                ..
            }
        ));

        let n = ProgressReport::new()
            .progress(5.0)
            .bounds(0.0, 10.0)
            .message("half")
            .build();
        assert_eq!(
            n,
            Notification::Progress {
                progress: Some(5.0),
                valuemin: Some(0.0),
                valuemax: Some(10.0),
                message: Some("half".to_string()),
            }
        );
    }
}
