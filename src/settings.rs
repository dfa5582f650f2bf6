use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthgateSettings {
    pub application: ApplicationSettings,
    pub provider: ProviderSettings,
    pub user_store: UserStoreSettings,
    pub static_files: StaticFilesSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
    /// Route unauthenticated viewers are sent to
    pub login_path: String,
    /// The protected view
    pub profile_path: String,
    /// How long a credential handler waits for the session watcher to publish
    /// the new state before redirecting
    pub session_sync_timeout_ms: u64,
}

/// Which identity provider (and matching document store) backs the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    IdentityToolkit,
    Memory,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity_toolkit" | "identitytoolkit" => Ok(Self::IdentityToolkit),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown provider kind '{other}'")),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityToolkit => f.write_str("identity_toolkit"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Identity provider project configuration
///
/// Mirrors the web SDK configuration record. Only `api_key` and `project_id`
/// are used by the REST clients; `auth_domain` and `project_id` are printed
/// at startup and the rest are carried for completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,

    // Direct value (can be overridden by environment variables)
    pub api_key: String,
    // Environment variable name for override
    pub api_key_env: Option<String>,

    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,

    pub identity_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStoreSettings {
    /// Write a user record on registration
    pub enabled: bool,
    /// Fail registration when the user record cannot be written
    pub required: bool,
    pub collection: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesSettings {
    pub assets_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
            login_path: "/login".to_string(),
            profile_path: "/profile".to_string(),
            session_sync_timeout_ms: 2000,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::IdentityToolkit,
            api_key: String::new(),
            api_key_env: None,
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            measurement_id: String::new(),
            identity_base_url: "https://identitytoolkit.googleapis.com".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for UserStoreSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            required: false, // Bookkeeping failures are logged, not reported
            collection: "users".to_string(),
            base_url: "https://firestore.googleapis.com".to_string(),
        }
    }
}

impl Default for StaticFilesSettings {
    fn default() -> Self {
        Self {
            assets_folder: "static".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthgateSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - Logger initialization fails
    /// - The resulting configuration is invalid
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Self::initialize_logging(&settings.logging)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Initialize `env_logger`, falling back to the configured level when
    /// `RUST_LOG` is unset
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    fn initialize_logging(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(logging.level.as_str()),
        )
        .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `AUTHGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    pub fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("AUTHGATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ AUTHGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_provider_env_overrides(&mut settings.provider);
        Self::apply_user_store_env_overrides(&mut settings.user_store);
        Self::apply_static_files_env_overrides(&mut settings.static_files);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
        if let Ok(login_path) = std::env::var("LOGIN_PATH") {
            app_settings.login_path = login_path;
        }
        if let Ok(profile_path) = std::env::var("PROFILE_PATH") {
            app_settings.profile_path = profile_path;
        }
    }

    /// Apply environment overrides for provider settings
    pub fn apply_provider_env_overrides(provider_settings: &mut ProviderSettings) {
        if let Ok(kind_str) = std::env::var("PROVIDER_KIND") {
            match kind_str.parse::<ProviderKind>() {
                Ok(kind) => provider_settings.kind = kind,
                Err(e) => eprintln!("⚠️  Ignoring PROVIDER_KIND: {e}"),
            }
        }
        if let Ok(api_key) = std::env::var("PROVIDER_API_KEY") {
            provider_settings.api_key = api_key;
        }
        if let Ok(project_id) = std::env::var("PROVIDER_PROJECT_ID") {
            provider_settings.project_id = project_id;
        }
        if let Ok(auth_domain) = std::env::var("PROVIDER_AUTH_DOMAIN") {
            provider_settings.auth_domain = auth_domain;
        }
        Self::apply_numeric_env_override(
            "PROVIDER_REQUEST_TIMEOUT_SECS",
            &mut provider_settings.request_timeout_secs,
        );
    }

    /// Apply environment overrides for user store settings
    pub fn apply_user_store_env_overrides(store_settings: &mut UserStoreSettings) {
        Self::apply_bool_env_override("USER_STORE_ENABLED", &mut store_settings.enabled);
        Self::apply_bool_env_override("USER_STORE_REQUIRED", &mut store_settings.required);
        if let Ok(collection) = std::env::var("USER_STORE_COLLECTION") {
            store_settings.collection = collection;
        }
    }

    fn apply_static_files_env_overrides(static_settings: &mut StaticFilesSettings) {
        if let Ok(assets_folder) = std::env::var("STATIC_FOLDER_PATH") {
            static_settings.assets_folder = assets_folder;
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_bool_env_override(env_var: &str, target: &mut bool) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<bool>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Check that the configuration can actually reach a provider
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or malformed value
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.application.login_path.starts_with('/') {
            return Err("application.login_path must start with '/'".into());
        }
        if !self.application.profile_path.starts_with('/') {
            return Err("application.profile_path must start with '/'".into());
        }
        if self.application.login_path == self.application.profile_path {
            return Err("application.login_path and profile_path must differ".into());
        }

        if self.provider.kind == ProviderKind::IdentityToolkit {
            if self.provider.get_api_key().is_none_or(|key| key.is_empty()) {
                return Err(
                    "provider.api_key is empty; set it in Settings.toml or PROVIDER_API_KEY".into(),
                );
            }
            url::Url::parse(&self.provider.identity_base_url)
                .map_err(|e| format!("provider.identity_base_url is invalid: {e}"))?;
            if self.user_store.enabled {
                if self.provider.project_id.is_empty() {
                    return Err("provider.project_id is required when user_store is enabled".into());
                }
                url::Url::parse(&self.user_store.base_url)
                    .map_err(|e| format!("user_store.base_url is invalid: {e}"))?;
            }
        }
        Ok(())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Whether the server only listens on a loopback interface
    ///
    /// The process holds a single provider session that every client of the
    /// HTTP surface shares, so a non-loopback bind exposes it to the network.
    #[must_use]
    pub fn binds_loopback_only(&self) -> bool {
        let host = self.application.host.trim();
        host.eq_ignore_ascii_case("localhost")
            || host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<std::net::IpAddr>()
                .is_ok_and(|ip| ip.is_loopback())
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[must_use]
    pub fn session_sync_timeout(&self) -> Duration {
        Duration::from_millis(self.application.session_sync_timeout_ms)
    }
}

impl ProviderSettings {
    /// Get the API key, checking the environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        Some(self.api_key.clone()).filter(|key| !key.is_empty())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        for var in [
            "PROVIDER_KIND",
            "PROVIDER_API_KEY",
            "PROVIDER_PROJECT_ID",
            "PROVIDER_AUTH_DOMAIN",
            "PROVIDER_REQUEST_TIMEOUT_SECS",
            "USER_STORE_ENABLED",
            "USER_STORE_REQUIRED",
            "USER_STORE_COLLECTION",
            "AUTHGATE_SECRETS_DIR",
            "TEST_AUTHGATE_API_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_loopback_detection() {
        let mut settings = AuthgateSettings::default();
        for host in ["127.0.0.1", "localhost", "::1", "[::1]", "127.0.0.2"] {
            settings.application.host = host.to_string();
            assert!(settings.binds_loopback_only(), "{host} should be loopback");
        }
        for host in ["0.0.0.0", "::", "10.9.9.9", "example.internal"] {
            settings.application.host = host.to_string();
            assert!(!settings.binds_loopback_only(), "{host} should not be loopback");
        }
    }

    #[test]
    fn test_defaults() {
        let settings = AuthgateSettings::default();
        assert_eq!(settings.application.login_path, "/login");
        assert_eq!(settings.get_bind_address(), "127.0.0.1:8080");
        assert!(settings.binds_loopback_only());
        assert_eq!(settings.application.profile_path, "/profile");
        assert_eq!(settings.provider.kind, ProviderKind::IdentityToolkit);
        assert!(settings.provider.api_key.is_empty());
        assert!(settings.user_store.enabled);
        assert!(!settings.user_store.required);
        assert_eq!(settings.user_store.collection, "users");
    }

    #[test]
    fn test_empty_api_key_fails_validation() {
        let settings = AuthgateSettings::default();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("provider.api_key"));
    }

    #[test]
    fn test_memory_provider_needs_no_credentials() {
        let mut settings = AuthgateSettings::default();
        settings.provider.kind = ProviderKind::Memory;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_project_id_required_for_user_store() {
        let mut settings = AuthgateSettings::default();
        settings.provider.api_key = "key".to_string();
        assert!(settings.validate().is_err());

        settings.user_store.enabled = false;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_route_paths_validated() {
        let mut settings = AuthgateSettings::default();
        settings.provider.kind = ProviderKind::Memory;
        settings.application.login_path = "login".to_string();
        assert!(settings.validate().is_err());

        settings.application.login_path = "/profile".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("memory".parse::<ProviderKind>(), Ok(ProviderKind::Memory));
        assert_eq!(
            "Identity_Toolkit".parse::<ProviderKind>(),
            Ok(ProviderKind::IdentityToolkit)
        );
        assert!("ldap".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: AuthgateSettings = basic_toml::from_str(
            r#"
[provider]
kind = "memory"
api_key = "abc"

[user_store]
required = true
"#,
        )
        .unwrap();

        assert_eq!(settings.provider.kind, ProviderKind::Memory);
        assert_eq!(settings.provider.api_key, "abc");
        assert_eq!(settings.provider.request_timeout_secs, 10);
        assert!(settings.user_store.required);
        assert_eq!(settings.user_store.collection, "users");
        assert_eq!(settings.application.port, 8080);
    }

    #[test]
    #[serial]
    fn test_provider_env_overrides() {
        clean_env_vars();

        let mut provider = ProviderSettings::default();
        std::env::set_var("PROVIDER_KIND", "memory");
        std::env::set_var("PROVIDER_API_KEY", "env-key");
        std::env::set_var("PROVIDER_PROJECT_ID", "env-project");
        std::env::set_var("PROVIDER_REQUEST_TIMEOUT_SECS", "3");

        AuthgateSettings::apply_provider_env_overrides(&mut provider);

        assert_eq!(provider.kind, ProviderKind::Memory);
        assert_eq!(provider.api_key, "env-key");
        assert_eq!(provider.project_id, "env-project");
        assert_eq!(provider.request_timeout(), Duration::from_secs(3));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clean_env_vars();

        let mut provider = ProviderSettings::default();
        let mut store = UserStoreSettings::default();
        std::env::set_var("PROVIDER_KIND", "ldap");
        std::env::set_var("PROVIDER_REQUEST_TIMEOUT_SECS", "soon");
        std::env::set_var("USER_STORE_REQUIRED", "maybe");

        AuthgateSettings::apply_provider_env_overrides(&mut provider);
        AuthgateSettings::apply_user_store_env_overrides(&mut store);

        assert_eq!(provider.kind, ProviderKind::IdentityToolkit);
        assert_eq!(provider.request_timeout_secs, 10);
        assert!(!store.required);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_user_store_env_overrides() {
        clean_env_vars();

        let mut store = UserStoreSettings::default();
        std::env::set_var("USER_STORE_ENABLED", "false");
        std::env::set_var("USER_STORE_REQUIRED", "true");
        std::env::set_var("USER_STORE_COLLECTION", "members");

        AuthgateSettings::apply_user_store_env_overrides(&mut store);

        assert!(!store.enabled);
        assert!(store.required);
        assert_eq!(store.collection, "members");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_api_key_env_indirection() {
        clean_env_vars();

        let provider = ProviderSettings {
            api_key: "direct-key".to_string(),
            api_key_env: Some("TEST_AUTHGATE_API_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(provider.get_api_key(), Some("direct-key".to_string()));

        std::env::set_var("TEST_AUTHGATE_API_KEY", "indirect-key");
        assert_eq!(provider.get_api_key(), Some("indirect-key".to_string()));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_secrets_dir_settings_file() {
        clean_env_vars();

        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("Settings.toml")).unwrap();
        writeln!(
            file,
            "[provider]\nproject_id = \"secret-project\"\n\n[application]\nport = 9090"
        )
        .unwrap();

        std::env::set_var("AUTHGATE_SECRETS_DIR", dir.path());
        let settings = AuthgateSettings::load_base_settings().unwrap();

        assert_eq!(settings.provider.project_id, "secret-project");
        assert_eq!(settings.application.port, 9090);

        clean_env_vars();
    }

    #[test]
    fn test_cors_origins_split() {
        let mut settings = AuthgateSettings::default();
        settings.application.cors_origins = "http://a.test, http://b.test,".to_string();
        assert_eq!(
            settings.get_cors_origins(),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
