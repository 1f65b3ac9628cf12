use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(path::PathBuf, #[source] std::io::Error),

    #[error("Failed to write config file {0}: {1}")]
    WriteFailed(path::PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No config path available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: usize,
}

/// Timeouts of the shared HTTP client used by STATUS_CODE and ENDPOINT probes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Whole-operation bound for STATUS_CODE checks
    pub status_check_timeout_ms: u64,
    pub user_agent: String,
}

/// Remote WebDriver hub and the dedicated DOM worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub hub_url: String,
    pub page_load_wait_seconds: u64,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "uppe-monitor.db".into(), max_connections: 8 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            read_timeout_ms: 5_000,
            status_check_timeout_ms: 3_000,
            user_agent: concat!("uppe-monitor/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            hub_url: "http://localhost:4444/wd/hub".into(),
            page_load_wait_seconds: 5,
            workers: 4,
            queue_capacity: 32,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn status_check_timeout(&self) -> Duration {
        Duration::from_millis(self.status_check_timeout_ms)
    }
}

impl BrowserConfig {
    pub fn page_load_wait(&self) -> Duration {
        Duration::from_secs(self.page_load_wait_seconds)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/monitor.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/monitor.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "HTTP")?;
        write_1(f, "Connect Timeout (ms)", &self.http.connect_timeout_ms)?;
        write_1(f, "Read Timeout (ms)", &self.http.read_timeout_ms)?;
        write_1(f, "Status Check Timeout (ms)", &self.http.status_check_timeout_ms)?;
        write_1(f, "User Agent", &self.http.user_agent)?;
        write_title_1(f, "Browser")?;
        write_1(f, "Hub URL", &self.browser.hub_url)?;
        write_1(f, "Page Load Wait (s)", &self.browser.page_load_wait_seconds)?;
        write_1(f, "Workers", &self.browser.workers)?;
        write_1(f, "Queue Capacity", &self.browser.queue_capacity)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/monitor.toml
    ///  or the specified path if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|err| ConfigError::ReadFailed(config_path.clone(), err))?;
            Self::from_toml(&raw_string)?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config from TOML text; missing sections and keys take their defaults
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::WriteFailed(path.to_path_buf(), err))?;
        }

        fs::write(path, config_str).map_err(|err| ConfigError::WriteFailed(path.to_path_buf(), err))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be at least 1");
        }
        if self.http.connect_timeout_ms == 0
            || self.http.read_timeout_ms == 0
            || self.http.status_check_timeout_ms == 0
        {
            return invalid("http timeouts must be greater than zero");
        }
        if self.browser.page_load_wait_seconds == 0 {
            return invalid("browser.page_load_wait_seconds must be greater than zero");
        }
        if self.browser.workers == 0 || self.browser.queue_capacity == 0 {
            return invalid("browser.workers and browser.queue_capacity must be at least 1");
        }
        if let Err(e) = url::Url::parse(&self.browser.hub_url) {
            return Err(ConfigError::Invalid(format!("browser.hub_url: {e}")));
        }

        Ok(())
    }
}
