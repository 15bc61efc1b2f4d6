//! Session-change notification channel for identity providers.

use tokio::sync::broadcast;

use super::IdentitySession;

/// Channel capacity for session-change notifications.
const CHANNEL_CAPACITY: usize = 16;

/// A provider session change: the new session, or `None` after sign-out.
pub type IdentityEvent = Option<IdentitySession>;

/// Sending half used by provider implementations.
#[derive(Debug, Clone)]
pub struct IdentityEvents {
    sender: broadcast::Sender<IdentityEvent>,
}

impl IdentityEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Notifies every live subscription. No subscribers is fine.
    pub fn publish(&self, event: IdentityEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.sender.subscribe())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for IdentityEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed out by [`super::IdentityProvider::subscribe`].
///
/// Dropping the subscription unsubscribes. [`Subscription::unsubscribe`] does
/// the same explicitly and may be called any number of times.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<broadcast::Receiver<IdentityEvent>>,
}

impl Subscription {
    pub fn new(receiver: broadcast::Receiver<IdentityEvent>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Waits for the next session change.
    ///
    /// Returns `None` once unsubscribed or when the provider is gone. If the
    /// subscriber fell behind, skipped events are dropped; each event carries
    /// the full session, so the next one supersedes them.
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stops receiving notifications. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}
