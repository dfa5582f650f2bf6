#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod authentication;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod session;
pub mod settings;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use authentication::{CredentialService, ServiceContainer};
pub use gate::{ProtectedView, ViewDecision};
pub use models::auth::{AuthError, AuthResult, ErrorKind};
pub use models::{SessionContext, User};
pub use session::{SessionHandle, SessionWatcher};
pub use settings::AuthgateSettings;
