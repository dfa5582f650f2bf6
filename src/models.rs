use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod auth;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// The signed-in user as reported by the identity provider
///
/// The provider owns this record; the application only mirrors it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: String,
}

impl User {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// Value published to every consumer of the session
///
/// Replaced wholesale on each provider event. There is no merge and no
/// history, so a consumer only ever sees the latest user (or none).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user: Option<User>,
}

impl SessionContext {
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Denormalized user document written to the application's document store
/// on registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
}

impl UserRecord {
    /// Convert the record into the untyped field map handed to a document store
    #[must_use]
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("uid".to_string(), Value::String(self.uid.clone()));
        fields.insert("email".to_string(), Value::String(self.email.clone()));
        fields
    }
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_context_defaults_to_anonymous() {
        let context = SessionContext::default();
        assert!(!context.is_authenticated());
        assert_eq!(context, SessionContext::anonymous());
    }

    #[test]
    fn test_user_record_fields() {
        let user = User::new("uid-1", "ada@example.com");
        let fields = UserRecord::from(&user).to_fields();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["uid"], Value::String("uid-1".to_string()));
        assert_eq!(fields["email"], Value::String("ada@example.com".to_string()));
    }

    #[test]
    fn test_session_context_serializes_user_field() {
        let context = SessionContext::signed_in(User::new("u", "u@example.com"));
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["user"]["email"], "u@example.com");

        let empty = serde_json::to_value(SessionContext::anonymous()).unwrap();
        assert!(empty["user"].is_null());
    }
}
