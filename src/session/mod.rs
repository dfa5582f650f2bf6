//! Session Management Module
//!
//! The signed-in user lives with the identity provider. This module mirrors it
//! into an observable [`SessionContext`](crate::models::SessionContext) that is
//! passed explicitly to whatever needs it.
//!
//! # Modules
//!
//! - [`watcher`] - provider subscription and the shared, observable context

pub mod watcher;

pub use watcher::{SessionHandle, SessionWatcher};
