//! Session watcher
//!
//! Mirrors the provider's signed-in user into a [`SessionContext`] that any
//! number of consumers can read or await. The watcher is the only writer.
//!
//! Lifecycle:
//! 1. [`SessionWatcher::start`] subscribes to the provider *before* reading its
//!    current session, so no transition between the two is lost.
//! 2. A spawned task replaces the context on every provider event. If the
//!    event channel lags, the task re-reads the provider instead of replaying.
//! 3. While a session is held, the task also wakes at its expiry so the
//!    provider can emit the `Expired` transition even when nobody asks.
//! 4. [`SessionWatcher::stop`] (or drop) aborts the task. Outstanding
//!    [`SessionHandle`]s keep the last published value.

use crate::models::{SessionContext, User};
use crate::provider::{AuthStateChange, IdentityProvider};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub struct SessionWatcher {
    handle: SessionHandle,
    task: Option<JoinHandle<()>>,
}

impl SessionWatcher {
    /// Register with the provider and start mirroring its state
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let events = provider.subscribe();
        let initial = SessionContext {
            user: provider.current_session().map(|s| s.user),
        };
        info!(
            "👀 Session watcher registered with {} provider ({})",
            provider.provider_name(),
            describe(&initial)
        );

        let (sender, receiver) = watch::channel(initial);
        let task = tokio::spawn(watch_provider(provider, events, sender));

        Self {
            handle: SessionHandle { receiver },
            task: Some(task),
        }
    }

    /// A handle for reading and awaiting the session context
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Unregister from the provider
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Session watcher stopped");
        }
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn watch_provider(
    provider: Arc<dyn IdentityProvider>,
    mut events: broadcast::Receiver<AuthStateChange>,
    sender: watch::Sender<SessionContext>,
) {
    loop {
        let expiry = provider.current_session().map(|s| s.expires_at);

        tokio::select! {
            event = events.recv() => match event {
                Ok(change) => {
                    debug!("Auth state change: {:?}", change.reason);
                    publish(&sender, change.user);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session watcher missed {skipped} auth events, resyncing");
                    publish(&sender, provider.current_session().map(|s| s.user));
                }
                Err(RecvError::Closed) => {
                    debug!("Provider event channel closed");
                    break;
                }
            },
            () = sleep_until(expiry) => {
                // Reading the session applies expiry; the resulting event
                // arrives on the next iteration
                let _ = provider.current_session();
            }
        }
    }
}

fn publish(sender: &watch::Sender<SessionContext>, user: Option<User>) {
    let context = SessionContext { user };
    info!("🔄 Session context updated ({})", describe(&context));
    sender.send_replace(context);
}

async fn sleep_until(expiry: Option<DateTime<Utc>>) {
    match expiry {
        Some(at) => {
            let remaining = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(remaining).await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn describe(context: &SessionContext) -> String {
    context
        .user
        .as_ref()
        .map_or_else(|| "anonymous".to_string(), |u| format!("user {}", u.email))
}

/// Read side of the shared session context
///
/// Cloning is cheap; every clone observes the same value.
#[derive(Clone)]
pub struct SessionHandle {
    receiver: watch::Receiver<SessionContext>,
}

impl SessionHandle {
    /// Snapshot of the current context
    #[must_use]
    pub fn current(&self) -> SessionContext {
        self.receiver.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.receiver.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.receiver.borrow().is_authenticated()
    }

    /// Subscribe to context replacements
    ///
    /// The receiver's `changed()` resolves after each replacement and errors
    /// once the watcher has stopped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionContext> {
        self.receiver.clone()
    }

    /// Wait until the context satisfies `predicate`, or give up after `timeout`
    ///
    /// Returns the matching context, or `None` on timeout or if the watcher
    /// stopped first. A context that already matches returns immediately.
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<SessionContext>
    where
        F: FnMut(&SessionContext) -> bool,
    {
        let mut receiver = self.receiver.clone();
        let matched = match tokio::time::timeout(timeout, receiver.wait_for(|c| predicate(c))).await
        {
            Ok(Ok(context)) => Some(context.clone()),
            Ok(Err(_)) | Err(_) => None,
        };
        matched
    }

    /// Wait until `user` (matched by uid) is the signed-in user
    pub async fn wait_for_user(&self, user: &User, timeout: Duration) -> bool {
        self.wait_for(timeout, |c| c.user.as_ref().is_some_and(|u| u.uid == user.uid))
            .await
            .is_some()
    }

    /// Wait until nobody is signed in
    pub async fn wait_for_sign_out(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |c| c.user.is_none()).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_starts_anonymous() {
        let provider: Arc<dyn IdentityProvider> = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider);

        assert!(watcher.is_running());
        assert_eq!(watcher.handle().current(), SessionContext::anonymous());
    }

    #[tokio::test]
    async fn test_seeds_from_existing_session() {
        let provider = Arc::new(MemoryProvider::new());
        provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();

        let watcher = SessionWatcher::start(provider);
        assert_eq!(
            watcher.handle().user().map(|u| u.email),
            Some("ada@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_mirrors_sign_in_and_sign_out() {
        let provider = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider.clone());
        let handle = watcher.handle();

        let session = provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert!(handle.wait_for_user(&session.user, WAIT).await);

        provider.sign_out().await.unwrap();
        assert!(handle.wait_for_sign_out(WAIT).await);
        assert!(!handle.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribers_see_replacements() {
        let provider = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider.clone());
        let mut receiver = watcher.handle().subscribe();

        provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();

        tokio::time::timeout(WAIT, receiver.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(receiver.borrow().is_authenticated());
    }

    #[tokio::test]
    async fn test_expiry_clears_context_without_reads() {
        let provider = Arc::new(
            MemoryProvider::new().with_token_lifetime(chrono::Duration::milliseconds(150)),
        );
        let watcher = SessionWatcher::start(provider.clone());
        let handle = watcher.handle();

        let session = provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert!(handle.wait_for_user(&session.user, WAIT).await);
        assert!(handle.wait_for_sign_out(WAIT).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_resyncs_after_missing_events() {
        let provider = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider.clone());
        let handle = watcher.handle();
        let session = provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();

        let mut receiver = handle.subscribe();
        receiver.borrow_and_update();

        // The memory provider never yields, so the watcher task cannot poll
        // until the loop is done and the channel has overflowed
        for _ in 0..20 {
            provider.sign_out().await.unwrap();
            provider
                .sign_in("ada@example.com", "hunter22")
                .await
                .unwrap();
        }
        provider.sign_out().await.unwrap();
        assert!(provider.current_session().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(receiver.has_changed().unwrap());
        assert_eq!(handle.current(), SessionContext::anonymous());

        provider
            .sign_in("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert!(handle.wait_for_user(&session.user, WAIT).await);
    }

    #[tokio::test]
    async fn test_stop_unregisters() {
        let provider = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider.clone());
        let handle = watcher.handle();
        watcher.stop();

        provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();

        // The handle keeps the last value; nothing new is published
        assert!(handle
            .wait_for(Duration::from_millis(200), SessionContext::is_authenticated)
            .await
            .is_none());
        assert!(!handle.is_authenticated());
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let provider: Arc<dyn IdentityProvider> = Arc::new(MemoryProvider::new());
        let watcher = SessionWatcher::start(provider);

        let result = watcher
            .handle()
            .wait_for(Duration::from_millis(50), SessionContext::is_authenticated)
            .await;
        assert!(result.is_none());
    }
}
