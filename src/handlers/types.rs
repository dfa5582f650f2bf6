// Request types shared by the credential handlers
use serde::Deserialize;

/// Body of `POST /auth/sign_up` and `POST /auth/sign_in`, as a form or JSON
#[derive(Deserialize)]
pub struct CredentialRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to send the browser on success
    pub rd: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub rd: Option<String>,
}
