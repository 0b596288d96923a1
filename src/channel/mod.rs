//! Notification transport consumed by the job monitor.
//!
//! A job worker publishes notifications on a named channel; the monitor holds
//! one [`Subscription`] to that channel and pulls notifications from it one at
//! a time, in arrival order, while polling is active.
//!
//! ## Components
//!
//! - [`bus`]: in-process publish/subscribe implementation
//! - [`callback`]: HTTP endpoint through which workers publish into a bus

use crate::notification::Notification;
use async_trait::async_trait;

pub mod bus;
pub mod callback;

pub use bus::NotificationBus;
pub use callback::{CallbackServer, report_notification};

/// A source of job channels.
pub trait NotificationChannel: Send + Sync {
    /// Subscribe to `channel_id`. Delivery starts once the handle starts polling.
    fn subscribe(&self, channel_id: &str) -> Box<dyn Subscription>;
}

/// Handle to one channel subscription.
///
/// Contract:
/// - notifications published before [`Subscription::start_polling`] are
///   buffered and delivered in order once polling starts
/// - [`Subscription::stop_polling`] is idempotent; once it returns, `next`
///   yields nothing more for this handle
/// - `next` is cancel-safe: dropping its future loses no notification
#[async_trait]
pub trait Subscription: Send {
    fn channel_id(&self) -> &str;

    fn start_polling(&mut self);

    fn stop_polling(&mut self);

    fn is_polling(&self) -> bool;

    /// Next notification, or `None` when not polling or the transport closed.
    async fn next(&mut self) -> Option<Notification>;
}
