//! Layered storefront configuration.
//!
//! Precedence, later layers winning:
//! 1. Built-in defaults
//! 2. `<home>/config.toml`
//! 3. `VANTALU_*` environment variables
//!
//! Home is `$VANTALU_HOME` when set, otherwise `~/.vantalu`. The cart and the
//! signed-in session are persisted next to the config file.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PACKAGING_FEE: u32 = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ENV_PREFIX: &str = "VANTALU";
const HOME_DIR_NAME: &str = ".vantalu";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error loading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },

    #[error("cannot determine home directory")]
    NoHome,
}

/// Where the menu comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Built-in dish list.
    #[default]
    Static,
    /// The `menu_items` table.
    Remote,
}

impl FromStr for CatalogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "remote" => Ok(Self::Remote),
            other => Err(other.to_string()),
        }
    }
}

/// Fully merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub home: PathBuf,
    pub backend_url: Option<String>,
    pub anon_key: Option<String>,
    realtime_url: Option<String>,
    pub packaging_fee: u32,
    pub request_timeout_secs: u64,
    pub catalog: CatalogSource,
}

impl StoreConfig {
    pub fn defaults(home: PathBuf) -> Self {
        Self {
            home,
            backend_url: None,
            anon_key: None,
            realtime_url: None,
            packaging_fee: DEFAULT_PACKAGING_FEE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            catalog: CatalogSource::default(),
        }
    }

    /// Explicit realtime endpoint, or `{backend_url}/realtime/v1`.
    pub fn realtime_url(&self) -> Option<String> {
        self.realtime_url.clone().or_else(|| {
            self.backend_url
                .as_deref()
                .map(|url| format!("{}/realtime/v1", url.trim_end_matches('/')))
        })
    }

    pub fn set_realtime_url(&mut self, url: impl Into<String>) {
        self.realtime_url = Some(url.into());
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn cart_path(&self) -> PathBuf {
        self.home.join("cart.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.home.join("session.json")
    }
}

/// Shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    backend_url: Option<String>,
    anon_key: Option<String>,
    realtime_url: Option<String>,
    packaging_fee: Option<u32>,
    request_timeout_secs: Option<u64>,
    catalog: Option<CatalogSource>,
}

/// Builder for layered configuration loading.
pub struct ConfigLoader {
    home: Option<PathBuf>,
    env_prefix: String,
    skip_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            home: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            skip_file: false,
            skip_env: false,
        }
    }

    /// Set the home directory explicitly instead of resolving it.
    pub fn with_home(mut self, path: PathBuf) -> Self {
        self.home = Some(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(self) -> Result<StoreConfig, ConfigError> {
        self.load_with_env(|key| env::var(key).ok())
    }

    /// Same as [`ConfigLoader::load`] with an injectable environment lookup.
    pub fn load_with_env(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<StoreConfig, ConfigError> {
        let home = match &self.home {
            Some(path) => path.clone(),
            None => resolve_home(&lookup, &self.env_prefix)?,
        };
        let mut config = StoreConfig::defaults(home);

        if !self.skip_file {
            let file = load_from_file(&config.config_path())?;
            merge_file(&mut config, file);
        }

        if !self.skip_env {
            apply_env_overrides(&mut config, &self.env_prefix, &lookup)?;
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_home(
    lookup: &impl Fn(&str) -> Option<String>,
    prefix: &str,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = lookup(&format!("{prefix}_HOME"))
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(HOME_DIR_NAME))
        .ok_or(ConfigError::NoHome)
}

fn load_from_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("config.toml not found at {}, using defaults", path.display());
            return Ok(FileConfig::default());
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };
    Ok(toml::from_str(&contents)?)
}

fn merge_file(config: &mut StoreConfig, file: FileConfig) {
    if file.backend_url.is_some() {
        config.backend_url = file.backend_url;
    }
    if file.anon_key.is_some() {
        config.anon_key = file.anon_key;
    }
    if file.realtime_url.is_some() {
        config.realtime_url = file.realtime_url;
    }
    if let Some(fee) = file.packaging_fee {
        config.packaging_fee = fee;
    }
    if let Some(secs) = file.request_timeout_secs {
        config.request_timeout_secs = secs;
    }
    if let Some(catalog) = file.catalog {
        config.catalog = catalog;
    }
}

fn apply_env_overrides(
    config: &mut StoreConfig,
    prefix: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let non_empty = |name: &str| {
        let var = format!("{prefix}_{name}");
        lookup(&var)
            .filter(|value| !value.trim().is_empty())
            .map(|value| (var, value))
    };

    if let Some((var, value)) = non_empty("BACKEND_URL") {
        tracing::debug!("Applying env override: {var}={value}");
        config.backend_url = Some(value);
    }
    if let Some((var, value)) = non_empty("ANON_KEY") {
        tracing::debug!("Applying env override: {var}");
        config.anon_key = Some(value);
    }
    if let Some((var, value)) = non_empty("REALTIME_URL") {
        tracing::debug!("Applying env override: {var}={value}");
        config.realtime_url = Some(value);
    }
    if let Some((var, value)) = non_empty("PACKAGING_FEE") {
        config.packaging_fee = parse_env(var, value, "whole rupees")?;
    }
    if let Some((var, value)) = non_empty("REQUEST_TIMEOUT_SECS") {
        config.request_timeout_secs = parse_env(var, value, "seconds")?;
    }
    if let Some((var, value)) = non_empty("CATALOG") {
        config.catalog = parse_env(var, value, "static/remote")?;
    }

    Ok(())
}

fn parse_env<T: FromStr>(var: String, value: String, expected: &str) -> Result<T, ConfigError> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::InvalidEnvValue {
            var,
            value,
            expected: expected.to_string(),
        }),
    }
}
