//! Service factory for creating configured authentication services
//!
//! Picks the identity provider and the document store from settings and
//! assembles the credential service around them.

use super::service::{CredentialService, UserRecordSink};
use crate::provider::{IdentityProvider, IdentityToolkitProvider, MemoryProvider};
use crate::settings::{AuthgateSettings, ProviderKind};
use crate::store::{DocumentStore, FirestoreStore, MemoryStore};
use anyhow::Context;
use std::sync::Arc;

/// Factory for creating authentication services with dependency injection
pub struct AuthenticationServiceFactory;

impl AuthenticationServiceFactory {
    /// Create the identity provider named by `provider.kind`
    ///
    /// # Errors
    ///
    /// Returns an error if the REST provider cannot be configured (missing
    /// API key, bad base URL, HTTP client construction)
    pub fn create_provider(settings: &AuthgateSettings) -> anyhow::Result<Arc<dyn IdentityProvider>> {
        let provider: Arc<dyn IdentityProvider> = match settings.provider.kind {
            ProviderKind::IdentityToolkit => Arc::new(
                IdentityToolkitProvider::new(&settings.provider)
                    .context("failed to configure Identity Toolkit provider")?,
            ),
            ProviderKind::Memory => Arc::new(MemoryProvider::new()),
        };
        log::info!(
            "✅ Identity provider configured ({})",
            provider.provider_name()
        );
        Ok(provider)
    }

    /// Create the document store for user records, or `None` if disabled
    ///
    /// The in-memory provider is paired with the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firestore client cannot be configured
    pub fn create_store(
        settings: &AuthgateSettings,
    ) -> anyhow::Result<Option<Arc<dyn DocumentStore>>> {
        if !settings.user_store.enabled {
            log::info!("⚠️  User record bookkeeping is disabled");
            return Ok(None);
        }

        let store: Arc<dyn DocumentStore> = match settings.provider.kind {
            ProviderKind::IdentityToolkit => Arc::new(
                FirestoreStore::new(&settings.provider, &settings.user_store)
                    .context("failed to configure Firestore user store")?,
            ),
            ProviderKind::Memory => Arc::new(MemoryStore::new()),
        };
        log::info!(
            "✅ User records go to {} collection '{}'{}",
            store.store_name(),
            settings.user_store.collection,
            if settings.user_store.required {
                " (required)"
            } else {
                ""
            }
        );
        Ok(Some(store))
    }

    /// Assemble a credential service around `provider` and an optional store
    #[must_use]
    pub fn create_credential_service(
        settings: &AuthgateSettings,
        provider: Arc<dyn IdentityProvider>,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> CredentialService {
        let service = CredentialService::new(provider, settings.provider.request_timeout());
        match store {
            Some(store) => service.with_user_records(UserRecordSink {
                store,
                collection: settings.user_store.collection.clone(),
                required: settings.user_store.required,
            }),
            None => service,
        }
    }
}
