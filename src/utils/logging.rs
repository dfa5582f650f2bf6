// Centralized logging for credential operations
use crate::models::auth::AuthError;
use crate::models::User;
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a completed registration
    pub fn log_registered(user: &User, provider: &str) {
        info!(
            "✅ Registered user: {} (uid: {}, provider: {})",
            user.email, user.uid, provider
        );
    }

    /// Log a completed sign-in
    pub fn log_authenticated(user: &User, provider: &str) {
        info!(
            "🔑 Authenticated user: {} (provider: {})",
            user.email, provider
        );
    }

    /// Log a completed sign-out
    pub fn log_signed_out(previous: Option<&User>) {
        match previous {
            Some(user) => info!("🚪 Signed out user: {}", user.email),
            None => debug!("Sign-out requested with no active session"),
        }
    }

    /// Log a rejected or failed credential operation
    pub fn log_operation_failed(operation: &str, error: &AuthError) {
        warn!(
            "❌ {} failed [{}]: {}",
            operation,
            error.kind(),
            error.message()
        );
    }

    pub fn log_user_record_written(collection: &str, document_id: &str) {
        debug!("User record written to {collection}/{document_id}");
    }

    /// Log a failed user record write; `required` decides whether it fails
    /// the registration
    pub fn log_user_record_failed(collection: &str, error: &AuthError, required: bool) {
        if required {
            warn!(
                "❌ User record write to '{}' failed, registration rejected: {}",
                collection,
                error.message()
            );
        } else {
            warn!(
                "⚠️  User record write to '{}' failed, continuing: {}",
                collection,
                error.message()
            );
        }
    }

    /// Log a credential request arriving over HTTP in development mode
    pub fn log_request_debug(req: &actix_web::HttpRequest, operation: &str) {
        debug!("{} request received via {}", operation, req.method());
        debug!("Request connection info: {:?}", req.connection_info());
    }
}
