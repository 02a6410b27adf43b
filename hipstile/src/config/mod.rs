//! Engine configuration stored in an INI file.
//!
//! ```ini
//! [cache]
//! budget_mb = 512
//! error_backoff_secs = 30
//!
//! [loader]
//! max_concurrent = 16
//! timeout_secs = 30
//! user_agent = hipstile/0.1.0
//!
//! [render]
//! split_order = 3
//! tile_width = 512
//! ```
//!
//! Missing files and missing keys fall back to defaults; values that do not
//! parse are reported as [`ConfigError::InvalidValue`].

mod keys;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::{CacheConfig, DEFAULT_BUDGET_BYTES, DEFAULT_ERROR_BACKOFF};
use crate::healpix::MAX_ORDER;
use crate::loader::{LoaderConfig, DEFAULT_MAX_CONCURRENT};
use crate::lod::RenderOptions;
use crate::properties::PropertyDefaults;
use crate::transport::TransportConfig;

pub use keys::ConfigKey;

const MB: u64 = 1024 * 1024;

/// Errors raised while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub budget_mb: u64,
    pub error_backoff_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            budget_mb: DEFAULT_BUDGET_BYTES / MB,
            error_backoff_secs: DEFAULT_ERROR_BACKOFF.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    pub max_concurrent: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: transport.timeout.as_secs(),
            user_agent: transport.user_agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub split_order: u8,
    pub tile_width: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            split_order: RenderOptions::default().split_order,
            tile_width: PropertyDefaults::default().tile_width,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub cache: CacheSettings,
    pub loader: LoaderSettings,
    pub render: RenderSettings,
}

/// Directory holding hipstile's configuration.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hipstile")
}

/// Default configuration file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

impl EngineConfig {
    /// Load from the default location; defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }

    /// Write to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            budget_bytes: self.cache.budget_mb.saturating_mul(MB),
            error_backoff: Duration::from_secs(self.cache.error_backoff_secs),
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            max_concurrent: self.loader.max_concurrent,
            transport: TransportConfig {
                timeout: Duration::from_secs(self.loader.timeout_secs),
                user_agent: self.loader.user_agent.clone(),
            },
        }
    }

    /// Property defaults seeded with the configured tile width.
    pub fn property_defaults(&self) -> PropertyDefaults {
        PropertyDefaults {
            tile_width: self.render.tile_width,
            ..PropertyDefaults::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            split_order: self.render.split_order.min(MAX_ORDER),
            ..RenderOptions::default()
        }
    }
}

/// Human-readable byte size (binary units).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
