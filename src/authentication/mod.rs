//! Authentication module: credential operations and their wiring
//!
//! [`CredentialService`] forwards register / authenticate / deauthenticate to
//! the identity provider. The factory and the service container assemble it
//! together with the session watcher from settings.

pub mod dependency_injection;
pub mod factory;
pub mod service;

pub use dependency_injection::{ServiceConfigBuilder, ServiceContainer};
pub use factory::AuthenticationServiceFactory;
pub use service::{CredentialService, UserRecordSink};
