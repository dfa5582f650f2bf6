// HTTP request handlers for the login page, credential endpoints and protected view
pub mod auth;
pub mod helpers;
pub mod profile;
pub mod static_files;
pub mod types;


use crate::settings::AuthgateSettings;
use actix_web::web;

// Re-export the main handler functions
pub use auth::{session_info, sign_in, sign_out, sign_up};
pub use profile::profile;
pub use static_files::{health, login_page};

/// Register every route; the login and profile paths come from settings
pub fn configure_services(cfg: &mut web::ServiceConfig, settings: &AuthgateSettings) {
    cfg.route(&settings.application.login_path, web::get().to(login_page))
        .route(&settings.application.profile_path, web::get().to(profile))
        .route("/auth/sign_up", web::post().to(sign_up))
        .route("/auth/sign_in", web::post().to(sign_in))
        .route("/auth/sign_out", web::get().to(sign_out))
        .route("/auth/sign_out", web::post().to(sign_out))
        .route("/auth/session", web::get().to(session_info))
        .route("/ping", web::get().to(health));
}
