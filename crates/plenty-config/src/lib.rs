//! Configuration for programs built on `plenty-api`.
//!
//! A TOML file merged with `PLENTY_` environment variables, translated into
//! the client's `BaseUrl`, `TransportConfig` and `AuthMode`. Also installs
//! the tracing subscriber.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use plenty_api::auth::{GpgDecryptor, PasswordSource};
use plenty_api::transport::{DEFAULT_MAX_PAGES, DEFAULT_MAX_THROTTLE_RETRIES};
use plenty_api::{AuthMode, BaseUrl, CredentialPrompt, CredentialStore, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured: {0}")]
    NoCredentials(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// System root, e.g. "https://shop.plentymarkets-cloud01.com".
    pub base_url: Option<String>,

    /// 0 warn, 1 info, 2 debug, 3+ trace.
    #[serde(default)]
    pub verbosity: u8,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Wait after a throttled request, in seconds.
    #[serde(default = "default_throttle_backoff")]
    pub throttle_backoff: u64,

    #[serde(default = "default_max_throttle_retries")]
    pub max_throttle_retries: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default)]
    pub auth: AuthSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            verbosity: 0,
            log_format: LogFormat::default(),
            timeout: default_timeout(),
            throttle_backoff: default_throttle_backoff(),
            max_throttle_retries: default_max_throttle_retries(),
            max_pages: default_max_pages(),
            auth: AuthSettings::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_throttle_backoff() -> u64 {
    3
}
fn default_max_throttle_retries() -> u32 {
    DEFAULT_MAX_THROTTLE_RETRIES
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How login credentials are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    /// Credential store, prompting when it is empty.
    #[default]
    Persistent,
    /// Prompt on every start.
    Interactive,
    /// `username` plus `password` or `password_file`.
    Direct,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthKind,

    pub username: Option<String>,

    /// Password in plaintext (prefer `password_file`).
    pub password: Option<String>,

    /// GPG encrypted file holding the password.
    pub password_file: Option<PathBuf>,
}

// ── Translation to client types ─────────────────────────────────────

impl Config {
    /// Validated base URL.
    pub fn base_url(&self) -> Result<BaseUrl, ConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::Validation {
                field: "base_url".into(),
                reason: "not configured".into(),
            })?;
        BaseUrl::parse(raw).map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: e.to_string(),
        })
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.timeout),
            throttle_backoff: Duration::from_secs(self.throttle_backoff),
            max_throttle_retries: self.max_throttle_retries,
            max_pages: self.max_pages,
        }
    }

    /// Build the login mode. `store` is only used in persistent mode,
    /// `prompt` in persistent and interactive mode.
    pub fn auth_mode(
        &self,
        store: Arc<dyn CredentialStore>,
        prompt: Arc<dyn CredentialPrompt>,
    ) -> Result<AuthMode, ConfigError> {
        let auth = &self.auth;
        match auth.mode {
            AuthKind::Persistent => Ok(AuthMode::Persistent { store, prompt }),
            AuthKind::Interactive => Ok(AuthMode::Interactive { prompt }),
            AuthKind::Direct => {
                let username = auth.username.clone().ok_or_else(|| {
                    ConfigError::NoCredentials("direct mode requires auth.username".into())
                })?;

                match (&auth.password, &auth.password_file) {
                    (Some(_), Some(_)) => Err(ConfigError::Validation {
                        field: "auth".into(),
                        reason: "set either password or password_file, not both".into(),
                    }),
                    (Some(password), None) => Ok(AuthMode::direct(username, password.clone())),
                    (None, Some(path)) => Ok(AuthMode::Direct {
                        username,
                        password: PasswordSource::EncryptedFile {
                            path: path.clone(),
                            decryptor: Arc::new(GpgDecryptor::default()),
                        },
                    }),
                    (None, None) => Err(ConfigError::NoCredentials(
                        "direct mode requires auth.password or auth.password_file".into(),
                    )),
                }
            }
        }
    }

    /// Install the tracing subscriber according to `verbosity` and
    /// `log_format`.
    pub fn init_tracing(&self) -> bool {
        match self.log_format {
            LogFormat::Text => init_tracing(self.verbosity),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter(self.verbosity))
                .try_init()
                .is_ok(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "plenty-api", "plenty-api").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("plenty-api");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment.
///
/// Nested keys use a double underscore: `PLENTY_AUTH__MODE=direct`.
/// A missing file leaves the defaults in place.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PLENTY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Tracing ─────────────────────────────────────────────────────────

fn env_filter(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a plain text subscriber. `RUST_LOG` takes precedence over
/// `verbosity`. Returns `false` if a subscriber was already installed.
pub fn init_tracing(verbosity: u8) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(false)
        .try_init()
        .is_ok()
}
