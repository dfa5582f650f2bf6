use super::{DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// In-memory document store for local development and tests
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<(String, Map<String, Value>)>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents appended to `collection`, in insertion order
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Map<String, Value>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(|docs| docs.iter().map(|(_, fields)| fields.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_document(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        _id_token: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), fields));
        Ok(id)
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
