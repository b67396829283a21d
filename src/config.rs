//! Client configuration and optional config file loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// The fixed upstream endpoint for the nationwide pollen forecast.
pub const DWD_URL: &str =
  "https://opendata.dwd.de/climate_environment/health/alerts/s31fg.json";

/// Tunables for the fetcher and the freshness cache.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Upstream endpoint URL.
  pub url: String,
  /// Maximum number of fetch attempts per refresh.
  pub max_retries: u32,
  /// Per-attempt network timeout.
  pub timeout: Duration,
  /// Initial backoff delay between attempts; doubles per attempt.
  pub base_delay: Duration,
  /// Backoff cap.
  pub max_delay: Duration,
  /// Local floor on refresh frequency, independent of the upstream's
  /// own next-update timestamp.
  pub min_refresh_interval: Duration,
  /// Snapshot file for the on-disk cache; `None` uses the default location.
  pub cache_file: Option<PathBuf>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      url: DWD_URL.to_string(),
      max_retries: 3,
      timeout: Duration::from_secs(30),
      base_delay: Duration::from_secs(2),
      max_delay: Duration::from_secs(30),
      min_refresh_interval: Duration::from_secs(60),
      cache_file: None,
    }
  }
}

impl ClientConfig {
  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.url = url.into();
    self
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
    self.base_delay = base_delay;
    self
  }

  pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
    self.min_refresh_interval = interval;
    self
  }
}

/// Optional yaml config file, merged over the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
  pub url: Option<String>,
  pub max_retries: Option<u32>,
  pub timeout_secs: Option<u64>,
  pub min_refresh_interval_secs: Option<u64>,
  pub cache_file: Option<PathBuf>,
}

impl ConfigFile {
  /// Load the config file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (missing file is an error)
  /// 2. ./bloomtracker.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bloomtracker/config.yaml
  ///
  /// No file found means defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, Error> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Runtime(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bloomtracker.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bloomtracker").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, Error> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Runtime(format!(
        "failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    serde_yaml::from_str(&contents).map_err(|e| {
      Error::Runtime(format!(
        "failed to parse config file {}: {}",
        path.display(),
        e
      ))
    })
  }

  /// Merge the file over [`ClientConfig::default`].
  pub fn into_client_config(self) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(url) = self.url {
      config.url = url;
    }
    if let Some(max_retries) = self.max_retries {
      config.max_retries = max_retries;
    }
    if let Some(secs) = self.timeout_secs {
      config.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = self.min_refresh_interval_secs {
      config.min_refresh_interval = Duration::from_secs(secs);
    }
    config.cache_file = self.cache_file;
    config
  }
}
