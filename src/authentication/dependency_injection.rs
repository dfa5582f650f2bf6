//! Dependency injection configuration for authentication services
//!
//! [`ServiceContainer`] owns everything a request handler needs: the settings,
//! the credential service and the session watcher. Handlers receive it through
//! `web::Data`; nothing is global.

use super::factory::AuthenticationServiceFactory;
use super::service::CredentialService;
use crate::provider::IdentityProvider;
use crate::session::{SessionHandle, SessionWatcher};
use crate::settings::AuthgateSettings;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Service configuration builder for dependency injection
#[derive(Clone, Default)]
pub struct ServiceConfigBuilder {
    user_store_enabled: Option<bool>,
    custom_provider: Option<Arc<dyn IdentityProvider>>,
    custom_store: Option<Arc<dyn DocumentStore>>,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable user record bookkeeping regardless of settings
    #[must_use]
    pub fn with_user_store_enabled(mut self, enabled: bool) -> Self {
        self.user_store_enabled = Some(enabled);
        self
    }

    /// Use a custom identity provider instead of the configured one
    #[must_use]
    pub fn with_custom_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.custom_provider = Some(provider);
        self
    }

    /// Use a custom document store instead of the configured one
    #[must_use]
    pub fn with_custom_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.custom_store = Some(store);
        self
    }

    /// Build the services and start the session watcher
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured provider or store cannot be created
    pub fn build(self, settings: AuthgateSettings) -> anyhow::Result<ServiceContainer> {
        log::info!("🏭 Starting authentication service factory...");

        let provider = match self.custom_provider {
            Some(provider) => {
                log::info!(
                    "✅ Identity provider injected ({})",
                    provider.provider_name()
                );
                provider
            }
            None => AuthenticationServiceFactory::create_provider(&settings)?,
        };

        let store_enabled = self
            .user_store_enabled
            .unwrap_or(settings.user_store.enabled);
        let store = if !store_enabled {
            log::info!("⚠️  User record bookkeeping is disabled");
            None
        } else if let Some(store) = self.custom_store {
            log::info!("✅ User store injected ({})", store.store_name());
            Some(store)
        } else {
            AuthenticationServiceFactory::create_store(&settings)?
        };

        let credentials =
            AuthenticationServiceFactory::create_credential_service(&settings, provider.clone(), store);
        let watcher = SessionWatcher::start(provider);

        log::info!("🏭 Authentication service factory completed successfully");
        Ok(ServiceContainer {
            settings,
            credentials,
            watcher,
        })
    }
}

/// Application service container for centralized dependency management
pub struct ServiceContainer {
    settings: AuthgateSettings,
    credentials: CredentialService,
    watcher: SessionWatcher,
}

impl ServiceContainer {
    /// Create a service container from settings alone
    ///
    /// # Errors
    ///
    /// Returns an error if the configured provider or store cannot be created
    pub fn new(settings: AuthgateSettings) -> anyhow::Result<Self> {
        ServiceConfigBuilder::new().build(settings)
    }

    #[must_use]
    pub const fn settings(&self) -> &AuthgateSettings {
        &self.settings
    }

    #[must_use]
    pub const fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    /// The shared session context
    #[must_use]
    pub fn session(&self) -> SessionHandle {
        self.watcher.handle()
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Cancel in-flight credential operations and stop the session watcher
    pub fn shutdown(self) {
        self.credentials.shutdown();
        self.watcher.stop();
        log::info!("👋 Authentication services shut down");
    }
}
