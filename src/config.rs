//! Client settings read from `~/.config/nzbfeed/config.toml`.
//!
//! Every key is optional. A missing or blank file gives `Config::default()`,
//! and keys this version does not know are reported but otherwise skipped.
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides `password` from the file.
pub const PASSWORD_ENV: &str = "NZBFEED_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
}

/// Connection and display settings.
///
/// Debug output masks `password`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the download server; `/jsonrpc` is appended.
    pub server_url: String,

    /// Control username for HTTP basic auth. No auth header when unset.
    pub username: Option<String>,

    /// Control password. `NZBFEED_PASSWORD` takes precedence.
    pub password: Option<String>,

    pub request_timeout_secs: u64,

    /// Rows per table page.
    pub page_size: usize,

    /// Delay before the "transmitting" indicator appears during a dispatch.
    pub transmit_delay_ms: u64,

    /// Hours added to item timestamps before computing their age.
    pub time_zone_correction_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:6789".to_string(),
            username: None,
            password: None,
            request_timeout_secs: 30,
            page_size: crate::feed::DEFAULT_PAGE_SIZE,
            transmit_delay_ms: 500,
            time_zone_correction_hours: 0,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("transmit_delay_ms", &self.transmit_delay_ms)
            .field(
                "time_zone_correction_hours",
                &self.time_zone_correction_hours,
            )
            .finish()
    }
}

impl Config {
    /// Largest accepted config file (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "server_url",
        "username",
        "password",
        "request_timeout_secs",
        "page_size",
        "transmit_delay_ms",
        "time_zone_correction_hours",
    ];

    /// Reads and parses `path`.
    ///
    /// Absence of the file is not an error. Oversized files are refused
    /// before they are read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                size,
                limit: Self::MAX_FILE_SIZE,
            });
        }

        let mut content = String::with_capacity(size as usize);
        file.take(Self::MAX_FILE_SIZE).read_to_string(&mut content)?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is blank, using defaults");
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        for key in table.keys() {
            if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, path = %path.display(), "Ignoring unknown config key");
            }
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        tracing::info!(path = %path.display(), server = %config.server_url, "Loaded configuration");
        Ok(config)
    }

    /// Applies environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_password_override(std::env::var(PASSWORD_ENV).ok());
        self
    }

    fn apply_password_override(&mut self, value: Option<String>) {
        if let Some(password) = value.filter(|p| !p.is_empty()) {
            tracing::debug!("Using control password from {}", PASSWORD_ENV);
            self.password = Some(password);
        }
    }
}
