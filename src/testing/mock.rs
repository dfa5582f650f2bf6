//! Mock providers and stores for failure-path tests

use crate::models::auth::{AuthError, AuthResult};
use crate::models::User;
use crate::provider::{AuthStateChange, IdentityProvider, MemoryProvider, ProviderSession};
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

/// Identity provider that delays every call and can fail the next one
///
/// Successful calls are served by an inner [`MemoryProvider`], so state
/// changes and events behave as usual.
pub struct ScriptedProvider {
    inner: MemoryProvider,
    delay: Option<Duration>,
    next_failure: Mutex<Option<AuthError>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryProvider::new(),
            delay: None,
            next_failure: Mutex::new(None),
        }
    }

    /// Sleep for `delay` before every remote call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next remote call with `error`
    pub fn fail_next(&self, error: AuthError) {
        *self
            .next_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    async fn before_call(&self) -> AuthResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self
            .next_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        self.before_call().await?;
        self.inner.create_account(email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        self.before_call().await?;
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self) -> AuthResult<Option<User>> {
        self.before_call().await?;
        self.inner.sign_out().await
    }

    fn current_session(&self) -> Option<ProviderSession> {
        self.inner.current_session()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.inner.subscribe()
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Document store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn add_document(
        &self,
        _collection: &str,
        _fields: Map<String, Value>,
        _id_token: Option<&str>,
    ) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("document store is offline".to_string()))
    }

    fn store_name(&self) -> &'static str {
        "failing"
    }
}
