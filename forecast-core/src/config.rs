use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

use crate::{error::RefreshError, location::Location};

pub const DEFAULT_STATION_BASE_URL: &str = "https://dd.weather.gc.ca/citypage_weather/xml";
pub const DEFAULT_ONECALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
pub const DEFAULT_REFRESH_MINUTES: u64 = 15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_location = "Markham"
/// refresh_interval_minutes = 15
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeatherMap key for the minute precipitation section.
    pub api_key: Option<String>,

    /// Name of the location shown when none is given on the command line.
    pub default_location: Option<String>,

    pub refresh_interval_minutes: u64,

    /// HTTP timeout applied to both upstreams.
    pub timeout_secs: u64,

    pub station_base_url: String,
    pub onecall_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            default_location: None,
            refresh_interval_minutes: DEFAULT_REFRESH_MINUTES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            station_base_url: DEFAULT_STATION_BASE_URL.to_string(),
            onecall_url: DEFAULT_ONECALL_URL.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_location", &self.default_location)
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("timeout_secs", &self.timeout_secs)
            .field("station_base_url", &self.station_base_url)
            .field("onecall_url", &self.onecall_url)
            .finish()
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast", "forecast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Store the API key; a blank key clears it.
    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        self.api_key = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.api_key.clone().unwrap_or_default())
    }

    /// The configured default location, or the first known one.
    pub fn default_location(&self) -> Result<Location, RefreshError> {
        match &self.default_location {
            Some(name) => Location::find(name),
            None => Ok(Location::default_location()),
        }
    }

    /// Never shorter than a minute.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.max(1) * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// The secondary source's API key for one session.
///
/// Blank strings count as absent. `Debug` never prints the key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// The key, if one is present.
    pub fn expose(&self) -> Option<&str> {
        (!self.0.is_empty()).then_some(self.0.as_str())
    }

    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("Credential(<redacted>)")
        } else {
            f.write_str("Credential(<empty>)")
        }
    }
}

/// Owner of the one credential that outlives a session.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Credential;

    /// Replace the stored credential. Persistence failures are not reported;
    /// the value is still kept for the rest of the session.
    fn set(&self, credential: Credential);
}

/// Keeps the credential in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    current: Mutex<Credential>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Credential) -> Self {
        Self {
            current: Mutex::new(credential),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Credential {
        self.current.lock().clone()
    }

    fn set(&self, credential: Credential) {
        *self.current.lock() = credential;
    }
}

/// Persists the credential as `api_key` in the config file, falling back to
/// memory when the file cannot be read or written.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: Option<PathBuf>,
    current: Mutex<Credential>,
}

impl FileCredentialStore {
    /// Store backed by the platform config file.
    pub fn open() -> Self {
        match Config::config_file_path() {
            Ok(path) => Self::at(path),
            Err(e) => {
                warn!("Credential storage not available, keeping key in memory: {e:#}");
                Self {
                    path: None,
                    current: Mutex::new(Credential::default()),
                }
            }
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let credential = match Config::load_from(&path) {
            Ok(cfg) => cfg.credential(),
            Err(e) => {
                warn!("Could not load stored credential: {e:#}");
                Credential::default()
            }
        };

        Self {
            path: Some(path),
            current: Mutex::new(credential),
        }
    }

    fn persist(path: &Path, credential: &Credential) -> Result<()> {
        let mut cfg = Config::load_from(path)?;
        cfg.set_api_key(credential.expose().unwrap_or_default());
        cfg.save_to(path)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Credential {
        self.current.lock().clone()
    }

    fn set(&self, credential: Credential) {
        if let Some(path) = &self.path {
            match Self::persist(path, &credential) {
                Ok(()) => debug!(path = %path.display(), "Saved credential"),
                Err(e) => warn!("Could not save credential, keeping it in memory only: {e:#}"),
            }
        }
        *self.current.lock() = credential;
    }
}
