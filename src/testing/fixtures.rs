//! Pre-built settings and services for tests

use crate::authentication::{ServiceConfigBuilder, ServiceContainer};
use crate::provider::MemoryProvider;
use crate::settings::{AuthgateSettings, ProviderKind};
use crate::store::MemoryStore;
use std::sync::Arc;

/// Settings for a fully in-memory setup with short timeouts
#[must_use]
pub fn memory_settings() -> AuthgateSettings {
    let mut settings = AuthgateSettings::default();
    settings.provider.kind = ProviderKind::Memory;
    settings.provider.request_timeout_secs = 5;
    settings.application.session_sync_timeout_ms = 1000;
    settings.static_files.assets_folder = "/nonexistent-authgate-assets".to_string();
    settings
}

/// Services plus handles on the in-memory backends behind them
pub struct TestServices {
    pub container: ServiceContainer,
    pub provider: Arc<MemoryProvider>,
    pub store: Arc<MemoryStore>,
}

/// Centralized test fixtures
pub struct TestFixtures;

impl TestFixtures {
    #[must_use]
    pub fn settings() -> AuthgateSettings {
        memory_settings()
    }

    /// Wired services over a fresh in-memory provider and store
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the services cannot be built from the in-memory settings.
    #[must_use]
    pub fn services() -> TestServices {
        Self::services_with(memory_settings())
    }

    /// Like [`TestFixtures::services`] with caller-adjusted settings
    ///
    /// # Panics
    ///
    /// Panics if the services cannot be built from `settings`.
    #[must_use]
    pub fn services_with(settings: AuthgateSettings) -> TestServices {
        let provider = Arc::new(MemoryProvider::new());
        let store = Arc::new(MemoryStore::new());
        let container = ServiceConfigBuilder::new()
            .with_custom_provider(provider.clone())
            .with_custom_store(store.clone())
            .build(settings)
            .expect("in-memory services should build");

        TestServices {
            container,
            provider,
            store,
        }
    }
}
