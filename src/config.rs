//! Client configuration.
//!
//! Settings are read from `.p4m/client.toml` in the project directory, or from
//! `<user config dir>/p4m/client.toml` when the project has none. A `.env`
//! file in the project directory is loaded first, and environment variables
//! override file values:
//!
//! | Variable                      | Setting                        |
//! |-------------------------------|--------------------------------|
//! | `P4M_API_HOST`                | `api.host`                     |
//! | `P4M_API_VERSION`             | `api.version`                  |
//! | `P4M_CLIENT_ID`               | `api.client_id`                |
//! | `P4M_CLIENT_SECRET`           | `api.client_secret`            |
//! | `P4M_TOKEN_REFRESH_OFFSET_MS` | `auth.token_refresh_offset_ms` |
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! host = "https://tracker.example.com"
//! version = 1
//! client_id = "web"
//! client_secret = "secret"
//!
//! [auth]
//! refresh_access_tokens = true
//! token_refresh_offset_ms = 5000
//!
//! [routes]
//! access_denied = "app.access-denied"
//! allow = ["app", "app.projects*", "app.project.*"]
//!
//! [locale]
//! catalog = "locales/en-us.json"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding project-level client files.
pub const CONFIG_DIR_NAME: &str = ".p4m";
/// Configuration file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "client.toml";
/// Stored tokens of the last sign-in, inside [`CONFIG_DIR_NAME`].
pub const SESSION_FILE_NAME: &str = "session.json";

/// Remote API location and OAuth client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

fn default_host() -> String {
    "http://localhost:8888".to_string()
}

fn default_version() -> u32 {
    1
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            version: default_version(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl ApiConfig {
    /// Base URL of the versioned API, e.g. `https://host/api/v1`.
    pub fn namespace_url(&self) -> String {
        format!("{}/api/v{}", self.host.trim_end_matches('/'), self.version)
    }

    /// OAuth token endpoint for password and refresh grants.
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.namespace_url())
    }

    /// Endpoint that accepts a new password for a reset token.
    pub fn reset_password_url(&self, reset_token: &str) -> String {
        format!("{}/resetpassword/{}", self.namespace_url(), reset_token)
    }
}

/// Session upkeep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Renew access tokens before they expire.
    #[serde(default = "default_refresh_access_tokens")]
    pub refresh_access_tokens: bool,
    /// Send the granted scope along with refresh requests.
    #[serde(default)]
    pub refresh_with_scope: bool,
    /// Safety margin subtracted from the expiry when arming the refresh timer.
    #[serde(default = "default_token_refresh_offset_ms")]
    pub token_refresh_offset_ms: u64,
}

fn default_refresh_access_tokens() -> bool {
    true
}

fn default_token_refresh_offset_ms() -> u64 {
    5_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_access_tokens: default_refresh_access_tokens(),
            refresh_with_scope: false,
            token_refresh_offset_ms: default_token_refresh_offset_ms(),
        }
    }
}

impl AuthConfig {
    pub fn token_refresh_offset(&self) -> Duration {
        Duration::from_millis(self.token_refresh_offset_ms)
    }
}

/// Well-known routes and the route access list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Where the access guard sends denied transitions.
    #[serde(default = "default_access_denied")]
    pub access_denied: String,
    /// The sign-in route.
    #[serde(default = "default_signin")]
    pub signin: String,
    /// Landing route after sign-in when no earlier route was requested.
    #[serde(default = "default_after_signin")]
    pub after_signin: String,
    /// Routes reachable without any grant.
    #[serde(default = "default_public_routes")]
    pub public: Vec<String>,
    /// Route patterns the signed-in user may enter.
    #[serde(default = "default_allowed_routes")]
    pub allow: Vec<String>,
}

fn default_access_denied() -> String {
    "app.access-denied".to_string()
}

fn default_signin() -> String {
    "signin".to_string()
}

fn default_after_signin() -> String {
    "app".to_string()
}

fn default_public_routes() -> Vec<String> {
    [
        "signin",
        "reset-password",
        "not-found",
        "app.access-denied",
        "app.loading-assets",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_routes() -> Vec<String> {
    vec!["app".to_string(), "app.*".to_string()]
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            access_denied: default_access_denied(),
            signin: default_signin(),
            after_signin: default_after_signin(),
            public: default_public_routes(),
            allow: default_allowed_routes(),
        }
    }
}

/// Translation catalog selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// JSON catalog, relative to the project directory or absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

fn default_language() -> String {
    "en-us".to_string()
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            catalog: None,
        }
    }
}

/// The complete client.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientToml {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

impl ClientToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse client.toml")
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize client.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("P4M_API_HOST") {
            self.api.host = host;
        }
        if let Some(version) = lookup("P4M_API_VERSION").and_then(|v| v.parse().ok()) {
            self.api.version = version;
        }
        if let Some(id) = lookup("P4M_CLIENT_ID") {
            self.api.client_id = id;
        }
        if let Some(secret) = lookup("P4M_CLIENT_SECRET") {
            self.api.client_secret = secret;
        }
        if let Some(offset) = lookup("P4M_TOKEN_REFRESH_OFFSET_MS").and_then(|v| v.parse().ok()) {
            self.auth.token_refresh_offset_ms = offset;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(self.api.host.starts_with("http://") || self.api.host.starts_with("https://")) {
            warnings.push(format!(
                "api.host '{}' should start with http:// or https://",
                self.api.host
            ));
        }
        if self.api.client_id.is_empty() {
            warnings.push("api.client_id is empty; token requests will be rejected".to_string());
        }
        if self.auth.refresh_access_tokens && self.auth.token_refresh_offset_ms == 0 {
            warnings.push(
                "auth.token_refresh_offset_ms is 0; tokens are renewed exactly at expiry"
                    .to_string(),
            );
        }
        if !self.routes.public.contains(&self.routes.access_denied) {
            warnings.push(format!(
                "routes.access_denied '{}' is not listed in routes.public; denied users would loop",
                self.routes.access_denied
            ));
        }

        warnings
    }
}

/// Resolved configuration: file values with env and CLI overrides applied.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_dir: PathBuf,
    /// The file the settings came from, if any.
    pub source: Option<PathBuf>,
    pub toml: ClientToml,
    pub verbose: bool,
}

impl ClientConfig {
    /// Load configuration for a project directory.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;

        let dotenv = project_dir.join(".env");
        if dotenv.exists() {
            dotenvy::from_path(&dotenv)
                .with_context(|| format!("Failed to load {}", dotenv.display()))?;
        }

        let source = Self::locate(&project_dir);
        let mut toml = match &source {
            Some(path) => ClientToml::load(path)?,
            None => ClientToml::default(),
        };
        toml.apply_env_overrides(|key| std::env::var(key).ok());
        tracing::debug!(source = ?source, host = %toml.api.host, "client configuration loaded");

        Ok(Self {
            project_dir,
            source,
            toml,
            verbose: false,
        })
    }

    /// Create a ClientConfig with CLI overrides.
    pub fn with_cli_args(project_dir: PathBuf, verbose: bool, api_host: Option<String>) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        if let Some(host) = api_host {
            config.toml.api.host = host;
        }
        Ok(config)
    }

    /// Path of the project-level configuration file.
    pub fn project_file(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Where `p4m signin` keeps the session tokens.
    pub fn session_file(&self) -> PathBuf {
        self.project_dir.join(CONFIG_DIR_NAME).join(SESSION_FILE_NAME)
    }

    fn locate(project_dir: &Path) -> Option<PathBuf> {
        let project_file = Self::project_file(project_dir);
        if project_file.exists() {
            return Some(project_file);
        }
        dirs::config_dir()
            .map(|dir| dir.join("p4m").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn api(&self) -> &ApiConfig {
        &self.toml.api
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.toml.auth
    }

    pub fn routes(&self) -> &RoutesConfig {
        &self.toml.routes
    }

    /// Absolute path of the translation catalog, if one is configured.
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.toml.locale.catalog.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.project_dir.join(path)
            }
        })
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
