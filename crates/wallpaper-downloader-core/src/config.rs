use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming the HTTP proxy
pub const PROXY_ENV_VAR: &str = "HTTP_PROXY";

/// Environment variable pointing at an optional JSON configuration file
pub const CONFIG_ENV_VAR: &str = "WALLPAPER_DOWNLOADER_CONFIG";

/// Configuration for a download-and-prune run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where downloaded images are written and pruned
    pub output_dir: PathBuf,

    /// HTTP proxy as `scheme://host:port`, direct connection when `None`
    pub proxy: Option<String>,

    /// Settings page listing every market
    pub settings_url: String,

    /// Host prefixed to relative image paths
    pub base_host: String,

    /// Hosts answered with an empty success and never contacted
    pub noop_hosts: Vec<String>,

    /// Connect timeout for every request
    pub connect_timeout_ms: u64,

    /// Read timeout for the settings page
    pub settings_read_timeout_ms: u64,

    /// Read timeout for a market page
    pub page_read_timeout_ms: u64,

    /// Read timeout for an image
    pub image_read_timeout_ms: u64,

    /// Attempts per endpoint, first try included
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            proxy: None,
            settings_url: "http://www.bing.com/account/general?FORM=O2HV46".to_string(),
            base_host: "http://www.bing.com".to_string(),
            noop_hosts: vec!["platform.bing.com".to_string()],
            connect_timeout_ms: 1_000,
            settings_read_timeout_ms: 2_000,
            page_read_timeout_ms: 10_000,
            image_read_timeout_ms: 5_000,
            max_attempts: 3,
        }
    }
}

/// Directory holding the running executable, falling back to the working directory
pub fn default_output_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Build the configuration from the environment.
    ///
    /// Starts from the file named by `WALLPAPER_DOWNLOADER_CONFIG` when set,
    /// otherwise from the defaults, then applies `HTTP_PROXY`.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Ok(proxy) = std::env::var(PROXY_ENV_VAR) {
            config = config.with_proxy(Some(proxy));
        }

        Ok(config)
    }

    /// Replace the proxy; blank values mean a direct connection
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    /// Replace the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn settings_read_timeout(&self) -> Duration {
        Duration::from_millis(self.settings_read_timeout_ms)
    }

    pub fn page_read_timeout(&self) -> Duration {
        Duration::from_millis(self.page_read_timeout_ms)
    }

    pub fn image_read_timeout(&self) -> Duration {
        Duration::from_millis(self.image_read_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_output_dir(&self.output_dir)?;

        if self.max_attempts == 0 {
            return Err(Error::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        for (field, url) in [
            ("settings_url", &self.settings_url),
            ("base_host", &self.base_host),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| Error::Configuration(format!("{} '{}': {}", field, url, e)))?;
        }

        if let Some(proxy) = &self.proxy {
            reqwest::Url::parse(proxy)
                .map_err(|e| Error::Configuration(format!("proxy '{}': {}", proxy, e)))?;
        }

        Ok(())
    }
}

/// Fail unless `dir` exists and is a directory
pub fn validate_output_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::Configuration(format!(
            "{} is not a valid folder",
            dir.display()
        )));
    }
    Ok(())
}
