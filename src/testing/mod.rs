//! Testing utilities for Authgate
//!
//! Compiled for unit tests and, behind the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! - [`fixtures`] - settings and fully wired services backed by the in-memory provider
//! - [`mock`] - providers and stores with scripted delays and failures
//! - [`assertions`] - response assertions for redirects and JSON bodies
//!
//! ```rust,ignore
//! use authgate::testing::fixtures::TestFixtures;
//!
//! let services = TestFixtures::services();
//! let user = services.credentials().register(TEST_EMAIL, TEST_PASSWORD).await?;
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use assertions::*;
pub use fixtures::TestFixtures;

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "ada@example.com";

    /// Password accepted by the in-memory provider's policy
    pub const TEST_PASSWORD: &str = "hunter22";

    /// Password rejected as too short
    pub const WEAK_PASSWORD: &str = "abc";
}
