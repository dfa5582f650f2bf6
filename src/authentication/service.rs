//! Credential operations
//!
//! `register`, `authenticate` and `deauthenticate` forward to the identity
//! provider and return one result shape, [`AuthResult`]. None of them touch the
//! shared session context: the provider emits an auth-state event and the
//! session watcher publishes it.
//!
//! Every provider call is bounded by the configured request timeout and raced
//! against cancellation (service shutdown or a caller-supplied token).

use crate::models::auth::{AuthError, AuthResult, ErrorKind};
use crate::models::{User, UserRecord};
use crate::provider::IdentityProvider;
use crate::store::DocumentStore;
use crate::utils::logging::LoggingHelper;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where and how the bookkeeping user record is written on registration
#[derive(Clone)]
pub struct UserRecordSink {
    pub store: Arc<dyn DocumentStore>,
    pub collection: String,
    /// Fail registration when the write fails
    pub required: bool,
}

#[derive(Clone)]
pub struct CredentialService {
    provider: Arc<dyn IdentityProvider>,
    user_records: Option<UserRecordSink>,
    request_timeout: Duration,
    shutdown: CancellationToken,
    caller: Option<CancellationToken>,
}

impl CredentialService {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, request_timeout: Duration) -> Self {
        Self {
            provider,
            user_records: None,
            request_timeout,
            shutdown: CancellationToken::new(),
            caller: None,
        }
    }

    /// Write a user record to `sink` after each successful registration
    #[must_use]
    pub fn with_user_records(mut self, sink: UserRecordSink) -> Self {
        self.user_records = Some(sink);
        self
    }

    /// A view of this service whose operations are also cancelled by `token`
    ///
    /// The view shares the provider and the shutdown signal with `self`.
    #[must_use]
    pub fn scoped(&self, token: CancellationToken) -> Self {
        Self {
            caller: Some(token),
            ..self.clone()
        }
    }

    /// Cancel every in-flight and future operation of this service and its
    /// scoped views
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Create an account, sign it in, and record it in the document store
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if email or password is empty
    /// - the provider's rejection (duplicate email, weak password, ...)
    /// - `Timeout` / `Cancelled`
    /// - `Bookkeeping` if the user record write fails and is required
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = require_credentials(email, password)?;

        let session = self
            .guarded("register", self.provider.create_account(email, password))
            .await
            .inspect_err(|e| LoggingHelper::log_operation_failed("register", e))?;

        if let Some(sink) = &self.user_records {
            let record = UserRecord::from(&session.user);
            let write = self
                .guarded("user record write", async {
                    sink.store
                        .add_document(&sink.collection, record.to_fields(), Some(&session.id_token))
                        .await
                        .map_err(|e| AuthError::new(ErrorKind::Bookkeeping, e.to_string()))
                })
                .await;

            match write {
                Ok(document_id) => {
                    LoggingHelper::log_user_record_written(&sink.collection, &document_id);
                }
                Err(e) if sink.required => {
                    LoggingHelper::log_user_record_failed(&sink.collection, &e, true);
                    // The account exists; leave it signed out so the failure is visible
                    if let Err(sign_out) = self.provider.sign_out().await {
                        LoggingHelper::log_operation_failed("deauthenticate", &sign_out);
                    }
                    return Err(AuthError::new(ErrorKind::Bookkeeping, e.message()));
                }
                Err(e) => LoggingHelper::log_user_record_failed(&sink.collection, &e, false),
            }
        }

        LoggingHelper::log_registered(&session.user, self.provider.provider_name());
        Ok(session.user)
    }

    /// Verify credentials and sign the account in
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if email or password is empty
    /// - the provider's rejection with its raw message
    /// - `Timeout` / `Cancelled`
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = require_credentials(email, password)?;

        let session = self
            .guarded("authenticate", self.provider.sign_in(email, password))
            .await
            .inspect_err(|e| LoggingHelper::log_operation_failed("authenticate", e))?;

        LoggingHelper::log_authenticated(&session.user, self.provider.provider_name());
        Ok(session.user)
    }

    /// Clear the provider-side session
    ///
    /// Returns the user that was signed out, or `None` if nobody was. The
    /// shared context is *not* cleared here; it follows once the watcher
    /// observes the provider's sign-out event.
    ///
    /// # Errors
    ///
    /// - the provider's failure to end the session
    /// - `Timeout` / `Cancelled`
    pub async fn deauthenticate(&self) -> AuthResult<Option<User>> {
        let previous = self
            .guarded("deauthenticate", self.provider.sign_out())
            .await
            .inspect_err(|e| LoggingHelper::log_operation_failed("deauthenticate", e))?;

        LoggingHelper::log_signed_out(previous.as_ref());
        Ok(previous)
    }

    async fn guarded<T, F>(&self, operation: &str, call: F) -> AuthResult<T>
    where
        F: Future<Output = AuthResult<T>>,
    {
        let cancelled = async {
            match &self.caller {
                Some(caller) => tokio::select! {
                    () = self.shutdown.cancelled() => {}
                    () = caller.cancelled() => {}
                },
                None => self.shutdown.cancelled().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(AuthError::new(
                ErrorKind::Cancelled,
                format!("{operation} was cancelled"),
            )),
            result = tokio::time::timeout(self.request_timeout, call) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(AuthError::new(
                    ErrorKind::Timeout,
                    format!(
                        "{operation} timed out after {}ms",
                        self.request_timeout.as_millis()
                    ),
                )),
            },
        }
    }
}

/// Reject blank credentials before they reach the provider, returning the
/// trimmed email
fn require_credentials<'a>(email: &'a str, password: &str) -> AuthResult<&'a str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::invalid_input("Email must not be empty"));
    }
    // Only checked trimmed; the password itself is forwarded as typed
    if password.trim().is_empty() {
        return Err(AuthError::invalid_input("Password must not be empty"));
    }
    Ok(email)
}
