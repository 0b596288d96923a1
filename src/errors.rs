//! Typed error hierarchy for jobwatch.
//!
//! One enum per boundary:
//! - `NotificationError` — decoding a raw `(channel, message)` payload
//! - `ChannelError` — callback endpoint lifecycle
//! - `NavigationError` — host navigation steps
//! - `ActionError` — named client action dispatch
//! - `ConfigError` — loading and saving `jobwatch.toml`
//!
//! None of these escape `JobMonitor::run`; the monitor logs and absorbs them.

use thiserror::Error;

/// Errors from decoding a notification payload.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification payload must be a [channel, message] pair")]
    NotAPair,

    #[error("Notification message on channel {channel} is not an object")]
    NotAnObject { channel: String },

    #[error("Invalid notification JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the notification transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to bind callback endpoint on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver notification to {url}: {message}")]
    DeliveryFailed { url: String, message: String },
}

/// Errors from a navigation step.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Cannot go back: already at the root location")]
    AtRoot,

    #[error("Navigation to {target} rejected: {reason}")]
    Rejected { target: String, reason: String },
}

/// Errors from dispatching a named client action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown client action '{name}'")]
    UnknownAction { name: String },

    #[error("Invalid parameters for action '{name}': {message}")]
    InvalidParams { name: String, message: String },
}

/// Errors from the configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse jobwatch.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize jobwatch.toml: {0}")]
    Serialize(#[from] toml::ser::Error),
}
