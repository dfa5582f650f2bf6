//! Document store used for application bookkeeping
//!
//! Only one capability is needed: append a record to a collection. There is no
//! read path.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Document store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document store rejected write ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Document encoding failed: {0}")]
    Encoding(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append one document to `collection`, returning the new document id
    ///
    /// `id_token` is the signed-in user's token, forwarded to stores that
    /// authorize writes per user.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be encoded or the store
    /// refuses or fails the write.
    async fn add_document(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        id_token: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Short name used in logs
    fn store_name(&self) -> &'static str;
}
