//! Protected-view gate
//!
//! Decides, from the shared session context alone, whether a protected view
//! may render. Evaluation is pure; HTTP rendering of the decision lives in
//! the handlers.

use crate::models::{SessionContext, User};
use crate::settings::AuthgateSettings;

/// Where the logout form of a rendered view posts to
pub const LOGOUT_ACTION: &str = "/auth/sign_out";

/// Outcome of evaluating a protected view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewDecision {
    /// Nobody is signed in. `replace` asks the client not to keep the
    /// protected URL in its history.
    Redirect { location: String, replace: bool },
    Render(ProfileView),
}

impl ViewDecision {
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Content of the protected view for a signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub user: User,
    /// Target of the logout action; it deauthenticates and leaves clearing
    /// the context to the session watcher
    pub logout_action: String,
}

#[derive(Debug, Clone)]
pub struct ProtectedView {
    login_path: String,
    logout_action: String,
}

impl ProtectedView {
    #[must_use]
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            logout_action: LOGOUT_ACTION.to_string(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AuthgateSettings) -> Self {
        Self::new(settings.application.login_path.clone())
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Redirect iff the context holds no user
    #[must_use]
    pub fn evaluate(&self, context: &SessionContext) -> ViewDecision {
        match &context.user {
            None => ViewDecision::Redirect {
                location: self.login_path.clone(),
                replace: true,
            },
            Some(user) => ViewDecision::Render(ProfileView {
                user: user.clone(),
                logout_action: self.logout_action.clone(),
            }),
        }
    }
}
