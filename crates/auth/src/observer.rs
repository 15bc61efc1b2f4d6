//! Relays identity provider session changes into the resolver.

use std::sync::Arc;

use taxlab_core::auth::Subscription;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{AuthError, Result};
use crate::resolver::AuthResolver;

/// Holds the resolver's single observer slot; frees it on drop.
struct ObserverSlot {
    resolver: Arc<AuthResolver>,
}

impl ObserverSlot {
    fn claim(resolver: Arc<AuthResolver>) -> Result<Self> {
        if !resolver.claim_observer_slot() {
            return Err(AuthError::ObserverAlreadyAttached);
        }
        Ok(Self { resolver })
    }
}

impl Drop for ObserverSlot {
    fn drop(&mut self) {
        self.resolver.release_observer_slot();
    }
}

/// Background task feeding provider notifications to an [`AuthResolver`].
///
/// At most one observer can be attached to a resolver at a time. Dropping
/// the observer aborts the task and drops the provider subscription.
pub struct SessionObserver {
    _slot: ObserverSlot,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SessionObserver {
    /// Subscribes to the resolver's provider and starts relaying.
    ///
    /// # Errors
    ///
    /// - `AuthError::ObserverAlreadyAttached` if another observer is attached
    /// - `AuthError::Config` when called outside a tokio runtime
    pub fn attach(resolver: Arc<AuthResolver>) -> Result<Self> {
        let slot = ObserverSlot::claim(resolver.clone())?;

        let runtime = Handle::try_current()
            .map_err(|e| AuthError::Config(format!("session observer needs a tokio runtime: {e}")))?;

        let subscription = resolver.provider().subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(relay(resolver, subscription, shutdown_rx));
        tracing::debug!("Session observer attached");

        Ok(Self {
            _slot: slot,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// Whether the relay task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops relaying and waits for the task to finish.
    pub async fn detach(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Session observer task failed");
                }
            }
        }
        tracing::debug!("Session observer detached");
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionObserver")
            .field("running", &self.is_running())
            .finish()
    }
}

async fn relay(
    resolver: Arc<AuthResolver>,
    mut subscription: Subscription,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => resolver.on_provider_change(event).await,
                None => {
                    tracing::info!("Identity provider closed its session channel");
                    break;
                }
            },
            _ = shutdown_rx.changed() => break,
        }
    }

    subscription.unsubscribe();
}
