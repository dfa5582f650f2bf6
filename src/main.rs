#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::warn;
use authgate::{
    authentication::ServiceContainer, handlers::configure_services, settings::AuthgateSettings,
    VERSION,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = AuthgateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let services = ServiceContainer::new(settings)
        .map_err(|e| std::io::Error::other(format!("Failed to build services: {e:#}")))?;

    start_server(web::Data::new(services)).await
}

/// Start the server around the shared services
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(services: web::Data<ServiceContainer>) -> std::io::Result<()> {
    let settings = services.settings().clone();
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let cors_origins = settings.get_cors_origins();
    let shutdown_handle = services.clone();

    let result = HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let settings = settings.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(services.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(move |cfg| configure_services(cfg, &settings))
    })
    .bind(&bind_address)?
    .run()
    .await;

    // Abort anything still in flight once the workers are gone
    shutdown_handle.credentials().shutdown();
    result
}

fn print_startup_info(bind_address: &str, settings: &AuthgateSettings) {
    let app = &settings.application;
    println!("Starting Authgate v{VERSION} on http://{bind_address}");
    println!("Identity provider: {}", settings.provider.kind);
    if !settings.provider.project_id.is_empty() {
        println!("  Project: {}", settings.provider.project_id);
    }
    if !settings.provider.auth_domain.is_empty() {
        println!("  Auth domain: {}", settings.provider.auth_domain);
    }
    if settings.user_store.enabled {
        println!(
            "User records: collection '{}'{}",
            settings.user_store.collection,
            if settings.user_store.required {
                " (required)"
            } else {
                " (best effort)"
            }
        );
    } else {
        println!("User records: disabled");
    }
    println!();
    println!("Pages:");
    println!("  GET  {:<22} - Login and sign-up page", app.login_path);
    println!("  GET  {:<22} - Protected profile view", app.profile_path);
    println!();
    println!("Credential endpoints (form or JSON):");
    println!("  POST /auth/sign_up            - Create an account");
    println!("  POST /auth/sign_in            - Sign in");
    println!("  GET|POST /auth/sign_out       - Sign out");
    println!("  GET  /auth/session            - Current session context");
    println!();
    println!("System endpoints:");
    println!("  GET  /ping                    - Health check");
    println!(
        "  Static files folder: {}",
        settings.static_files.assets_folder
    );

    if !settings.binds_loopback_only() {
        warn!(
            "⚠️  Listening on non-loopback address {bind_address}: every client that can reach it shares the single signed-in session"
        );
    }
}
