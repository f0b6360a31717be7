use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment type for configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Get environment from string
    pub fn parse(env: &str) -> Self {
        match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// Short name used for `config.<env>.toml` overlays
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Production => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Records older than this many seconds are treated as absent
    #[serde(default)]
    pub max_age: Option<u64>,

    #[serde(default)]
    pub cache: SessionCacheConfig,

    #[serde(default)]
    pub cookie: CookieConfig,

    #[serde(default)]
    pub storage: SessionStorageConfig,
}

impl SessionConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

/// Read-through cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Lifetime of a cached entry in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,

    #[serde(default)]
    pub backend: CacheBackendConfig,
}

impl SessionCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheBackendConfig {
    /// In-process cache
    Memory {
        #[serde(default = "default_cache_max_entries")]
        max_entries: usize,
    },
    /// Redis cache (requires the `redis` feature)
    Redis {
        url: String,
        #[serde(default = "default_redis_prefix")]
        prefix: String,
        #[serde(default = "default_redis_pool_size")]
        pool_size: usize,
        #[serde(default = "default_redis_command_timeout")]
        command_timeout: u64,
    },
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        Self::Memory {
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Durable session storage selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionStorageConfig {
    /// In-process storage, lost on restart
    Memory,
    /// SQLite document table
    Sqlite {
        url: String,
        #[serde(default = "default_sessions_table")]
        table: String,
    },
}

impl Default for SessionStorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Cookie attributes for the session identifier cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,

    /// Cookie lifetime in seconds; None makes it a browser-session cookie
    #[serde(default)]
    pub max_age: Option<u64>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default = "default_cookie_path")]
    pub path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default = "default_http_only")]
    pub http_only: bool,

    #[serde(default = "default_same_site")]
    pub same_site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    600
} // 10 minutes
fn default_cache_max_entries() -> usize {
    10_000
}
fn default_redis_prefix() -> String {
    "datastore-ext:session:".to_string()
}
fn default_redis_pool_size() -> usize {
    10
}
fn default_redis_command_timeout() -> u64 {
    3000
} // 3 seconds
fn default_sessions_table() -> String {
    "sessions".to_string()
}
fn default_cookie_name() -> String {
    "session.id".to_string()
}
fn default_cookie_path() -> String {
    "/".to_string()
}
fn default_http_only() -> bool {
    true
}
fn default_same_site() -> String {
    "Lax".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age: None,
            cache: SessionCacheConfig::default(),
            cookie: CookieConfig::default(),
            storage: SessionStorageConfig::default(),
        }
    }
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl: default_cache_ttl(),
            backend: CacheBackendConfig::default(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            max_age: None,
            domain: None,
            path: default_cookie_path(),
            secure: false,
            http_only: default_http_only(),
            same_site: default_same_site(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load `config.toml` and the environment overlay from a directory
    ///
    /// The overlay `config.<env>.toml` is merged at the TOML level so a
    /// partial overlay only replaces the keys it sets. Environment variable
    /// overrides are applied last.
    pub fn load_with_base_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let env = Self::detect_environment();

        let base_path = base_dir.join("config.toml");
        let mut merged = if base_path.exists() {
            Self::load_toml_value(&base_path)?
        } else {
            log::debug!(
                "No config.toml in '{}', starting from defaults",
                base_dir.display()
            );
            toml::Value::Table(toml::map::Map::new())
        };

        let env_path = base_dir.join(format!("config.{}.toml", env.as_str()));
        if env_path.exists() {
            let overlay = Self::load_toml_value(&env_path)?;
            merged = serde_toml_merge::merge(merged, overlay).map_err(|e| {
                Error::config(format!(
                    "Failed to merge '{}' into base configuration: {}",
                    env_path.display(),
                    e
                ))
            })?;
            log::debug!("Merged environment overlay: {}", env_path.display());
        }

        // Deserialize through serde_json so the merged value type does not matter
        let json_value = serde_json::to_value(&merged).map_err(|e| {
            Error::config(format!("Failed to convert merged configuration: {}", e))
        })?;
        let mut config: AppConfig = serde_json::from_value(json_value)
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))?;
        config.environment = env;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a single TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}. Make sure the file exists and is readable.",
                path_ref.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        log::debug!(
            "Successfully loaded configuration from: {}",
            path_ref.display()
        );
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Check TOML syntax: {}", e)))
    }

    fn load_toml_value(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}. Check TOML syntax.",
                path.display(),
                e
            ))
        })
    }

    /// Detect current environment from `DATASTORE_EXT_ENV`
    pub fn detect_environment() -> Environment {
        env::var("DATASTORE_EXT_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or_default()
    }

    /// Apply environment variable overrides on top of the loaded values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("DATASTORE_EXT_SESSION_MAX_AGE") {
            self.session.max_age = parse_max_age(&value)?;
        }

        if let Ok(value) = env::var("DATASTORE_EXT_SESSION_CACHE") {
            self.session.cache.enabled = parse_flag(&value)?;
        }

        if let Ok(level) = env::var("DATASTORE_EXT_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}

fn parse_max_age(value: &str) -> Result<Option<u64>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value.parse::<u64>().map(Some).map_err(|_| {
        Error::config(format!(
            "DATASTORE_EXT_SESSION_MAX_AGE must be a number of seconds, got '{}'",
            value
        ))
    })
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "DATASTORE_EXT_SESSION_CACHE must be a boolean, got '{}'",
            other
        ))),
    }
}
