//! Firestore REST document store
//!
//! Writes use `createDocument` with Firestore's typed-value JSON encoding.

use super::{DocumentStore, StoreError};
use crate::settings::{ProviderSettings, UserStoreSettings};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Deserialize)]
struct CreatedDocument {
    name: String,
}

pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    api_key: Option<String>,
}

impl FirestoreStore {
    /// Create a store for the configured project
    ///
    /// # Errors
    ///
    /// Returns an error if the project id is empty or the HTTP client cannot
    /// be built.
    pub fn new(provider: &ProviderSettings, store: &UserStoreSettings) -> Result<Self, StoreError> {
        if provider.project_id.is_empty() {
            return Err(StoreError::Unavailable(
                "provider.project_id is not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(provider.request_timeout())
            .build()?;

        let documents_url = format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            store.base_url.trim_end_matches('/'),
            provider.project_id
        );

        Ok(Self {
            client,
            documents_url,
            api_key: provider.get_api_key().filter(|key| !key.is_empty()),
        })
    }
}

/// Encode one JSON value as a Firestore typed value
///
/// # Errors
///
/// Returns an error for numbers that fit neither `i64` nor `f64`.
pub fn encode_value(value: &Value) -> Result<Value, StoreError> {
    Ok(match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // int64 values travel as strings
                json!({ "integerValue": i.to_string() })
            } else if let Some(f) = n.as_f64() {
                json!({ "doubleValue": f })
            } else {
                return Err(StoreError::Encoding(format!("unsupported number {n}")));
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items.iter().map(encode_value).collect::<Result<Vec<_>, _>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map)? } }),
    })
}

/// Encode a field map as the `fields` object of a Firestore document
///
/// # Errors
///
/// Returns an error if any value cannot be encoded.
pub fn encode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), encode_value(value)?)))
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add_document(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        id_token: Option<&str>,
    ) -> Result<String, StoreError> {
        let url = format!("{}/{collection}", self.documents_url);
        let body = json!({ "fields": encode_fields(&fields)? });
        debug!("POST {url}");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        if let Some(token) = id_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedDocument = response.json().await?;
        // name is projects/{p}/databases/(default)/documents/{collection}/{id}
        let id = created
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(id)
    }

    fn store_name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> (ProviderSettings, UserStoreSettings) {
        let provider = ProviderSettings {
            api_key: "test-api-key".to_string(),
            project_id: "demo-project".to_string(),
            ..Default::default()
        };
        let store = UserStoreSettings {
            base_url: server.uri(),
            ..Default::default()
        };
        (provider, store)
    }

    #[test]
    fn test_encode_scalar_values() {
        assert_eq!(
            encode_value(&json!("ada")).unwrap(),
            json!({ "stringValue": "ada" })
        );
        assert_eq!(
            encode_value(&json!(42)).unwrap(),
            json!({ "integerValue": "42" })
        );
        assert_eq!(
            encode_value(&json!(1.5)).unwrap(),
            json!({ "doubleValue": 1.5 })
        );
        assert_eq!(
            encode_value(&json!(true)).unwrap(),
            json!({ "booleanValue": true })
        );
        assert_eq!(
            encode_value(&Value::Null).unwrap(),
            json!({ "nullValue": null })
        );
    }

    #[test]
    fn test_encode_nested_values() {
        let encoded = encode_value(&json!({ "tags": ["a", 1], "meta": { "ok": false } })).unwrap();
        assert_eq!(
            encoded,
            json!({
                "mapValue": { "fields": {
                    "tags": { "arrayValue": { "values": [
                        { "stringValue": "a" },
                        { "integerValue": "1" }
                    ] } },
                    "meta": { "mapValue": { "fields": {
                        "ok": { "booleanValue": false }
                    } } }
                } }
            })
        );
    }

    #[test]
    fn test_missing_project_id() {
        let store = FirestoreStore::new(&ProviderSettings::default(), &UserStoreSettings::default());
        assert!(matches!(store, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_add_document_posts_typed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/demo-project/databases/(default)/documents/users",
            ))
            .and(query_param("key", "test-api-key"))
            .and(header("authorization", "Bearer id-token"))
            .and(body_json(json!({
                "fields": {
                    "uid": { "stringValue": "uid-1" },
                    "email": { "stringValue": "ada@example.com" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo-project/databases/(default)/documents/users/doc-42",
                "fields": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (provider, store_settings) = settings_for(&server);
        let store = FirestoreStore::new(&provider, &store_settings).unwrap();

        let mut fields = Map::new();
        fields.insert("uid".to_string(), json!("uid-1"));
        fields.insert("email".to_string(), json!("ada@example.com"));

        let id = store
            .add_document("users", fields, Some("id-token"))
            .await
            .unwrap();
        assert_eq!(id, "doc-42");
    }

    #[tokio::test]
    async fn test_add_document_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let (provider, store_settings) = settings_for(&server);
        let store = FirestoreStore::new(&provider, &store_settings).unwrap();

        let err = store
            .add_document("users", Map::new(), None)
            .await
            .unwrap_err();
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "PERMISSION_DENIED");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
