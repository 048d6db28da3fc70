//! Settings loading.
//!
//! Settings live in a TOML document located at:
//! 1. the `--settings` command-line flag
//! 2. `$MAILREADER_SETTINGS` (environment variable)
//! 3. `settings.toml` in the working directory
//!
//! The document holds one table per concern. `[mail_reader]` configures the
//! IMAP account and output directory, `[logging]` configures log output:
//!
//! ```toml
//! [mail_reader]
//! user = "me@example.com"
//! password = "app-password"
//! host = "imap.example.com"
//! port = 993
//! ssl = true
//! path_attachments = "attachments"
//!
//! [logging]
//! level = "info"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "MAILREADER_SETTINGS";

/// Settings file used when neither the flag nor the env var is set.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

/// Table holding the mail reader configuration.
pub const MAIL_READER_KEY: &str = "mail_reader";

/// Table holding the logging configuration.
pub const LOGGING_KEY: &str = "logging";

pub const DEFAULT_HOST: &str = "imap.gmail.com";
pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_PATH_ATTACHMENTS: &str = "attachments";
pub const DEFAULT_MAILBOX: &str = "INBOX";
pub const DEFAULT_SEARCH: &str = "ALL";

/// IMAP account and output settings for one run.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Login user name.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Address of the mailbox being read. Informational only.
    pub mail: Option<String>,
    /// IMAP server host name.
    pub host: String,
    /// IMAP server port.
    pub port: u16,
    /// Use implicit TLS. Unset means TLS.
    pub ssl: Option<bool>,
    /// Root directory for saved attachments.
    pub path_attachments: PathBuf,
    /// Mailbox to select.
    pub mailbox: String,
    /// IMAP SEARCH criteria used by a full pass.
    pub search: String,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Directory for `mailreader.log`. Stderr only when unset.
    pub dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            mail: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl: None,
            path_attachments: PathBuf::from(DEFAULT_PATH_ATTACHMENTS),
            mailbox: DEFAULT_MAILBOX.to_string(),
            search: DEFAULT_SEARCH.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("mail", &self.mail)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("path_attachments", &self.path_attachments)
            .field("mailbox", &self.mailbox)
            .field("search", &self.search)
            .finish()
    }
}

impl ReaderConfig {
    /// Build a typed configuration from a settings sub-table, filling in defaults.
    pub fn from_table(table: toml::Table) -> Result<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| {
                ReaderError::Config(format!("invalid [{MAIL_READER_KEY}] table: {e}"))
            })
    }

    /// Whether the session should be wrapped in TLS.
    pub fn use_tls(&self) -> bool {
        self.ssl.unwrap_or(true)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Determine the settings file path (flag first, then env var, then default).
pub fn settings_file_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(env_path) = std::env::var(SETTINGS_ENV) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_SETTINGS_FILE)
}

/// Read the sub-table stored under `key` in the default settings file.
///
/// The file is re-read on every call.
pub fn get_config(key: &str) -> Result<Option<toml::Table>> {
    get_config_from(&settings_file_path(None), key)
}

/// Read the sub-table stored under `key` in the settings file at `path`.
///
/// Returns `Ok(None)` when the key is absent or does not hold a table.
pub fn get_config_from(path: &Path, key: &str) -> Result<Option<toml::Table>> {
    let contents = std::fs::read_to_string(path).map_err(|e| ReaderError::Settings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut document: toml::Table =
        toml::from_str(&contents).map_err(|e| ReaderError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    match document.remove(key) {
        Some(toml::Value::Table(table)) => Ok(Some(table)),
        Some(_) => {
            tracing::warn!(path = %path.display(), key, "Settings key is not a table");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Load the `[mail_reader]` table as a [`ReaderConfig`].
pub fn load_reader_config(path: &Path) -> Result<ReaderConfig> {
    let table = get_config_from(path, MAIL_READER_KEY)?.ok_or_else(|| {
        ReaderError::Config(format!(
            "no [{MAIL_READER_KEY}] table in {}",
            path.display()
        ))
    })?;
    let config = ReaderConfig::from_table(table)?;
    tracing::info!(path = %path.display(), host = %config.host, "Loaded settings");
    Ok(config)
}

/// Load the `[logging]` table, falling back to defaults when it is missing
/// or the file cannot be read.
pub fn load_logging_config(path: &Path) -> LoggingConfig {
    match get_config_from(path, LOGGING_KEY) {
        Ok(Some(table)) => match toml::Value::Table(table).try_into::<LoggingConfig>() {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Invalid [{LOGGING_KEY}] settings, using defaults: {e}");
                LoggingConfig::default()
            }
        },
        Ok(None) | Err(_) => LoggingConfig::default(),
    }
}
