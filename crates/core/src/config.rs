//! TOML-based configuration system for samsync.
//!
//! All sensitive values (the SAM.gov API key, the Azure AD client secret)
//! are stored as `_env` fields that reference environment variable names.
//! The actual secrets are resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon / scheduling settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// SAM.gov API settings.
    pub sam: SamConfig,

    /// Azure AD app registration used for SharePoint authentication.
    pub azure: AzureConfig,

    /// SharePoint target site and list settings.
    pub sharepoint: SharePointConfig,
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon / scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between sync runs (default 21600, i.e. every 6 hours).
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sync_interval() -> u64 {
    21600
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// SAM.gov
// ---------------------------------------------------------------------------

/// SAM.gov API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamConfig {
    /// Environment variable holding the SAM.gov API key.
    pub api_key_env: String,

    /// Opportunity search endpoint.
    #[serde(default = "default_sam_base_url")]
    pub base_url: String,

    /// How far back to pull opportunities, in days (default 30).
    #[serde(default = "default_days_to_sync")]
    pub days_to_sync: i64,

    /// Delay after every SAM.gov call, in milliseconds. SAM.gov allows
    /// 10 requests per second; the default of 110ms stays just under that.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Whether to download resource links and attach them to created items.
    #[serde(default = "default_true")]
    pub download_attachments: bool,

    /// Resolved API key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_sam_base_url() -> String {
    "https://api.sam.gov/opportunities/v2/search".into()
}
fn default_days_to_sync() -> i64 {
    30
}
fn default_rate_limit_delay_ms() -> u64 {
    110
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Azure AD
// ---------------------------------------------------------------------------

/// Azure AD app registration for the client-credentials flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Directory (tenant) ID.
    pub tenant_id: String,

    /// Application (client) ID.
    pub client_id: String,

    /// Environment variable holding the client secret.
    pub client_secret_env: String,

    /// Resolved client secret (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub client_secret: Option<String>,
}

// ---------------------------------------------------------------------------
// SharePoint
// ---------------------------------------------------------------------------

/// SharePoint target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointConfig {
    /// Full site URL, e.g. `https://tenant.sharepoint.com/sites/sitename`.
    pub site_url: String,

    /// Display name of the target list.
    #[serde(default = "default_list_name")]
    pub list_name: String,
}

fn default_list_name() -> String {
    "SAM Opportunities".into()
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables and populate the
    /// corresponding resolved fields.
    ///
    /// Fields that reference a missing variable will log a warning but will
    /// **not** fail here -- [`validate`](Self::validate) rejects a config
    /// whose required secrets remain unresolved.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.sam.api_key = resolve_optional_env(&self.sam.api_key_env, "sam.api_key_env");
        self.azure.client_secret =
            resolve_optional_env(&self.azure.client_secret_env, "azure.client_secret_env");

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    ///
    /// Must run after [`resolve_env_vars`](Self::resolve_env_vars); a missing
    /// secret is a fatal configuration error before any network call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sharepoint.site_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sharepoint.site_url".into(),
                detail: "SharePoint site URL must not be empty".into(),
            });
        }
        if !self.sharepoint.site_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "sharepoint.site_url".into(),
                detail: "SharePoint site URL must start with https://".into(),
            });
        }
        if self.sharepoint.list_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sharepoint.list_name".into(),
                detail: "list name must not be empty".into(),
            });
        }
        if self.azure.tenant_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "azure.tenant_id".into(),
                detail: "tenant ID must not be empty".into(),
            });
        }
        if self.azure.client_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "azure.client_id".into(),
                detail: "client ID must not be empty".into(),
            });
        }
        if self.sam.days_to_sync <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "sam.days_to_sync".into(),
                detail: "sync window must be > 0 days".into(),
            });
        }
        if self.daemon.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "daemon.sync_interval_secs".into(),
                detail: "sync interval must be > 0".into(),
            });
        }
        if self.sam.api_key.is_none() {
            return Err(ConfigError::EnvVarMissing {
                var: self.sam.api_key_env.clone(),
                field: "sam.api_key_env".into(),
            });
        }
        if self.azure.client_secret.is_none() {
            return Err(ConfigError::EnvVarMissing {
                var: self.azure.client_secret_env.clone(),
                field: "azure.client_secret_env".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
