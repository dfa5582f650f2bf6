//! Identity Toolkit REST client
//!
//! Talks to `accounts:signUp` and `accounts:signInWithPassword` with the
//! project's API key. Sign-out is local: the tokens are dropped and listeners
//! are notified, the same as the browser SDK does.

use super::{AuthStateCell, AuthStateChange, IdentityProvider, ProviderSession};
use crate::models::auth::{AuthError, AuthResult};
use crate::models::User;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Token lifetime assumed when the provider omits `expiresIn`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const LOGGED_BODY_CHARS: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct IdentityToolkitProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    state: AuthStateCell,
}

impl IdentityToolkitProvider {
    /// Create a client from provider settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API key is missing or the HTTP
    /// client cannot be built.
    pub fn new(settings: &ProviderSettings) -> AuthResult<Self> {
        let api_key = settings
            .get_api_key()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AuthError::configuration("provider.api_key is not configured"))?;

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.identity_base_url.trim_end_matches('/').to_string(),
            api_key,
            state: AuthStateCell::new(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/accounts:{method}", self.base_url)
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<ProviderSession> {
        let url = self.endpoint(method);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::from_provider(format!("Malformed {method} response: {e}"))
        })?;

        Ok(Self::session_from_token(token, email))
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> AuthError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => AuthError::from_provider(envelope.error.message),
            Err(_) => {
                // Upstream pages can be large HTML; only the status reaches the caller
                warn!("Unrecognized provider error body (HTTP {status})");
                debug!(
                    "Provider error body: {}",
                    body.chars().take(LOGGED_BODY_CHARS).collect::<String>()
                );
                AuthError::from_provider(format!("HTTP {status}"))
            }
        }
    }

    fn session_from_token(token: TokenResponse, requested_email: &str) -> ProviderSession {
        let lifetime = token
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        ProviderSession {
            user: User {
                uid: token.local_id,
                email: token.email.unwrap_or_else(|| requested_email.to_string()),
            },
            id_token: token.id_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        let session = self.password_call("signUp", email, password).await?;
        info!("✅ Account created for {}", session.user.email);
        self.state.set(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        let session = self
            .password_call("signInWithPassword", email, password)
            .await?;
        info!("🔑 Signed in {}", session.user.email);
        self.state.set(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> AuthResult<Option<User>> {
        Ok(self.state.clear())
    }

    fn current_session(&self) -> Option<ProviderSession> {
        self.state.current()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.state.subscribe()
    }

    fn provider_name(&self) -> &'static str {
        "identity_toolkit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ErrorKind;
    use crate::provider::ChangeReason;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> IdentityToolkitProvider {
        let settings = ProviderSettings {
            api_key: "test-api-key".to_string(),
            project_id: "demo-project".to_string(),
            identity_base_url: server.uri(),
            ..Default::default()
        };
        IdentityToolkitProvider::new(&settings).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let settings = ProviderSettings::default();
        let err = IdentityToolkitProvider::new(&settings).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_not_echoed() {
        let server = MockServer::start().await;
        let page = format!("<html><body>{}</body></html>", "upstream failure ".repeat(500));
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(502).set_body_string(page))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .sign_in("ada@example.com", "hunter22")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.message(), "HTTP 502 Bad Gateway");
        assert!(provider.current_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_success_sets_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .and(query_param("key", "test-api-key"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "password": "hunter22",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#SignupNewUserResponse",
                "localId": "uid-123",
                "email": "ada@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut events = provider.subscribe();

        let session = provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.user, User::new("uid-123", "ada@example.com"));
        assert!(session.expires_at > Utc::now() + Duration::seconds(3500));

        let event = events.recv().await.unwrap();
        assert_eq!(event.reason, ChangeReason::SignedIn);
        assert_eq!(provider.current_session().unwrap().user.uid, "uid-123");
    }

    #[tokio::test]
    async fn test_sign_in_rejection_keeps_raw_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "INVALID_LOGIN_CREDENTIALS",
                    "errors": [{"message": "INVALID_LOGIN_CREDENTIALS", "domain": "global", "reason": "invalid"}]
                }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .sign_in("ada@example.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
        assert_eq!(err.message(), "INVALID_LOGIN_CREDENTIALS");
        assert!(provider.current_session().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .create_account("ada@example.com", "hunter22")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(err.message().contains("502"));
    }

    #[tokio::test]
    async fn test_sign_out_is_local() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        let mut events = provider.subscribe();

        assert_eq!(provider.sign_out().await.unwrap(), None);
        assert_eq!(events.recv().await.unwrap().reason, ChangeReason::SignedOut);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_missing_expiry_uses_default_lifetime() {
        let token = TokenResponse {
            local_id: "uid".to_string(),
            email: None,
            id_token: "t".to_string(),
            refresh_token: None,
            expires_in: None,
        };
        let session = IdentityToolkitProvider::session_from_token(token, "fallback@example.com");
        assert_eq!(session.user.email, "fallback@example.com");
        assert!(session.expires_at > Utc::now() + Duration::seconds(3500));
    }
}
