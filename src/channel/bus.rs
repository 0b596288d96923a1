//! In-process publish/subscribe bus keyed by channel name.

use super::{NotificationChannel, Subscription};
use crate::notification::Notification;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

type SubscriberId = u64;

#[derive(Debug, Default)]
struct BusState {
    next_id: SubscriberId,
    channels: HashMap<String, Vec<(SubscriberId, mpsc::UnboundedSender<Notification>)>>,
}

/// Cloneable handle to a shared notification bus.
///
/// Publishing never blocks: each subscription owns an unbounded queue, which
/// is what lets a subscription buffer notifications until it starts polling.
#[derive(Debug, Clone, Default)]
pub struct NotificationBus {
    state: Arc<Mutex<BusState>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Notification bus lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Deliver `notification` to every live subscription of `channel`.
    ///
    /// Returns the number of subscriptions reached.
    pub fn publish(&self, channel: &str, notification: Notification) -> usize {
        let mut state = self.lock();
        let Some(subscribers) = state.channels.get_mut(channel) else {
            tracing::debug!(channel, "No subscribers, notification dropped");
            return 0;
        };
        subscribers.retain(|(_, tx)| tx.send(notification.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            state.channels.remove(channel);
        }
        delivered
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock()
            .channels
            .get(channel)
            .map(|subs| subs.iter().filter(|(_, tx)| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn unsubscribe(&self, channel: &str, id: SubscriberId) {
        let mut state = self.lock();
        if let Some(subscribers) = state.channels.get_mut(channel) {
            subscribers.retain(|(sub_id, _)| *sub_id != id);
            if subscribers.is_empty() {
                state.channels.remove(channel);
            }
        }
    }
}

impl NotificationChannel for NotificationBus {
    fn subscribe(&self, channel_id: &str) -> Box<dyn Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state
                .channels
                .entry(channel_id.to_string())
                .or_default()
                .push((id, tx));
            id
        };
        tracing::debug!(channel = channel_id, subscriber = id, "Subscribed");
        Box::new(BusSubscription {
            bus: self.clone(),
            id,
            channel_id: channel_id.to_string(),
            rx: Some(rx),
            polling: false,
        })
    }
}

/// Subscription handle returned by [`NotificationBus`].
pub struct BusSubscription {
    bus: NotificationBus,
    id: SubscriberId,
    channel_id: String,
    rx: Option<mpsc::UnboundedReceiver<Notification>>,
    polling: bool,
}

#[async_trait]
impl Subscription for BusSubscription {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn start_polling(&mut self) {
        if self.rx.is_some() {
            self.polling = true;
        }
    }

    fn stop_polling(&mut self) {
        self.polling = false;
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            self.bus.unsubscribe(&self.channel_id, self.id);
            tracing::debug!(channel = %self.channel_id, subscriber = self.id, "Stopped polling");
        }
    }

    fn is_polling(&self) -> bool {
        self.polling
    }

    async fn next(&mut self) -> Option<Notification> {
        if !self.polling {
            return None;
        }
        self.rx.as_mut()?.recv().await
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
