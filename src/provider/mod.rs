//! Identity provider abstraction
//!
//! The provider owns account creation, credential checks and the signed-in
//! session. The rest of the crate only sees the [`IdentityProvider`] trait:
//!
//! - [`identity_toolkit`] - REST client for an Identity Toolkit compatible service
//! - [`memory`] - in-process provider for local development and tests
//!
//! Providers push [`AuthStateChange`] events whenever the signed-in user
//! changes (sign-in, sign-out, token expiry). [`AuthStateCell`] holds the
//! state and the event channel so each implementation only deals with its
//! transport.

pub mod identity_toolkit;
pub mod memory;

pub use identity_toolkit::IdentityToolkitProvider;
pub use memory::MemoryProvider;

use crate::models::auth::AuthResult;
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the auth-state event channel
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why the signed-in user changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    SignedIn,
    SignedOut,
    Expired,
}

/// Event pushed by a provider whenever the signed-in user changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub user: Option<User>,
    pub reason: ChangeReason,
}

/// Signed-in session as held by the provider client
#[derive(Clone)]
pub struct ProviderSession {
    pub user: User,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl ProviderSession {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Tokens stay out of logs
impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("user", &self.user)
            .field("id_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity provider operations consumed by the application
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a remote account and sign it in
    ///
    /// # Errors
    ///
    /// Returns an error carrying the provider's raw message if the account
    /// cannot be created (duplicate email, weak password, malformed email,
    /// transport failure).
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<ProviderSession>;

    /// Verify credentials and sign the account in
    ///
    /// # Errors
    ///
    /// Returns an error carrying the provider's raw message if the
    /// credentials are rejected or the provider cannot be reached.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderSession>;

    /// Clear the signed-in session, returning the user that was signed out
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to end the session.
    async fn sign_out(&self) -> AuthResult<Option<User>>;

    /// Current session, if any. Expired sessions are cleared (and an
    /// `Expired` event emitted) as a side effect.
    fn current_session(&self) -> Option<ProviderSession>;

    /// Register a listener for auth-state changes
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;

    /// Short name used in logs
    fn provider_name(&self) -> &'static str;
}

/// Signed-in state shared by provider implementations
///
/// Every transition goes through [`AuthStateCell::set`], [`AuthStateCell::clear`]
/// or [`AuthStateCell::expire_if_due`], each of which publishes exactly one
/// event.
pub struct AuthStateCell {
    session: RwLock<Option<ProviderSession>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl Default for AuthStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateCell {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: RwLock::new(None),
            events,
        }
    }

    /// Replace the session and publish a `SignedIn` event
    pub fn set(&self, session: ProviderSession) {
        let user = session.user.clone();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.publish(Some(user), ChangeReason::SignedIn);
    }

    /// Drop the session and publish a `SignedOut` event
    ///
    /// The event is published even if nobody was signed in, matching the
    /// provider behaviour of always notifying listeners on sign-out.
    pub fn clear(&self) -> Option<User> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.publish(None, ChangeReason::SignedOut);
        previous.map(|s| s.user)
    }

    /// Drop the session if its token has expired, publishing an `Expired` event
    pub fn expire_if_due(&self, now: DateTime<Utc>) -> bool {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let due = guard.as_ref().is_some_and(|s| s.is_expired_at(now));
        if due {
            *guard = None;
            drop(guard);
            self.publish(None, ChangeReason::Expired);
        }
        due
    }

    /// Current session after applying expiry
    pub fn current(&self) -> Option<ProviderSession> {
        self.expire_if_due(Utc::now());
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }

    fn publish(&self, user: Option<User>, reason: ChangeReason) {
        // No receivers is fine: nobody is watching yet
        let _ = self.events.send(AuthStateChange { user, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> ProviderSession {
        ProviderSession {
            user: User::new("uid-1", "ada@example.com"),
            id_token: "secret-id-token".to_string(),
            refresh_token: Some("secret-refresh-token".to_string()),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(Duration::hours(1)));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn test_set_and_clear_publish_events() {
        let cell = AuthStateCell::new();
        let mut events = cell.subscribe();

        cell.set(session(Duration::hours(1)));
        let signed_in = events.try_recv().unwrap();
        assert_eq!(signed_in.reason, ChangeReason::SignedIn);
        assert_eq!(signed_in.user.unwrap().email, "ada@example.com");

        let previous = cell.clear();
        assert_eq!(previous.unwrap().uid, "uid-1");
        let signed_out = events.try_recv().unwrap();
        assert_eq!(signed_out.reason, ChangeReason::SignedOut);
        assert!(signed_out.user.is_none());
    }

    #[test]
    fn test_clear_without_session_still_notifies() {
        let cell = AuthStateCell::new();
        let mut events = cell.subscribe();

        assert!(cell.clear().is_none());
        assert_eq!(events.try_recv().unwrap().reason, ChangeReason::SignedOut);
    }

    #[test]
    fn test_expired_session_is_cleared_on_read() {
        let cell = AuthStateCell::new();
        cell.set(session(Duration::seconds(-1)));
        let mut events = cell.subscribe();

        assert!(cell.current().is_none());
        let expired = events.try_recv().unwrap();
        assert_eq!(expired.reason, ChangeReason::Expired);
        assert!(expired.user.is_none());

        // Only one event for one transition
        assert!(!cell.expire_if_due(Utc::now()));
        assert!(events.try_recv().is_err());
    }
}
