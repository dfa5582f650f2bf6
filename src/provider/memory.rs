//! In-process identity provider
//!
//! Keeps accounts in memory and reproduces the provider's validation rules and
//! error codes, so the rest of the application behaves the same as against the
//! real service. Intended for local development and tests; passwords are kept
//! in memory as given.

use super::{AuthStateCell, AuthStateChange, IdentityProvider, ProviderSession};
use crate::models::auth::{AuthError, AuthResult};
use crate::models::User;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Minimum password length enforced by the provider's default policy
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

struct Account {
    uid: String,
    email: String,
    password: String,
    disabled: bool,
}

pub struct MemoryProvider {
    accounts: Mutex<HashMap<String, Account>>,
    token_lifetime: Duration,
    state: AuthStateCell,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            token_lifetime: Duration::hours(1),
            state: AuthStateCell::new(),
        }
    }

    /// Override how long issued sessions stay valid
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Mark an existing account as disabled so further sign-ins are refused
    pub fn disable_account(&self, email: &str) -> bool {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts
            .get_mut(&normalize(email))
            .map(|account| account.disabled = true)
            .is_some()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn issue_session(&self, uid: &str, email: &str) -> ProviderSession {
        ProviderSession {
            user: User::new(uid, email),
            id_token: Uuid::new_v4().simple().to_string(),
            refresh_token: Some(Uuid::new_v4().simple().to_string()),
            expires_at: Utc::now() + self.token_lifetime,
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::from_provider("MISSING_EMAIL"));
    }
    if !EMAIL_PATTERN.is_match(email.trim()) {
        return Err(AuthError::from_provider("INVALID_EMAIL"));
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::from_provider("MISSING_PASSWORD"));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::from_provider(format!(
                "WEAK_PASSWORD : Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let key = normalize(email);
        let session = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&key) {
                return Err(AuthError::from_provider("EMAIL_EXISTS"));
            }
            let uid = Uuid::new_v4().simple().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    uid: uid.clone(),
                    email: key.clone(),
                    password: password.to_string(),
                    disabled: false,
                },
            );
            self.issue_session(&uid, &key)
        };

        info!("✅ Account created for {key} (in-memory provider)");
        self.state.set(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::from_provider("MISSING_PASSWORD"));
        }

        let session = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts
                .get(&normalize(email))
                .filter(|account| account.password == password)
                .ok_or_else(|| AuthError::from_provider("INVALID_LOGIN_CREDENTIALS"))?;
            if account.disabled {
                return Err(AuthError::from_provider(
                    "USER_DISABLED : The user account has been disabled by an administrator.",
                ));
            }
            self.issue_session(&account.uid, &account.email)
        };

        self.state.set(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> AuthResult<Option<User>> {
        Ok(self.state.clear())
    }

    fn current_session(&self) -> Option<ProviderSession> {
        self.state.current()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.state.subscribe()
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
