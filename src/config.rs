use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::ShellType;

/// Version written to, and required from, saved configuration files.
pub const SCHEMA_VERSION: &str = "1.1";

/// Largest shell size selector (12" shells).
pub const MAX_SIZE: f32 = 4.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unsupported config schema version {0:?}")]
    UnsupportedSchema(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Normal,
    High,
}

impl Quality {
    /// Numeric level used to scale spark frequencies and child counts.
    pub const fn factor(self) -> f32 {
        match self {
            Quality::Low => 1.0,
            Quality::Normal => 2.0,
            Quality::High => 3.0,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Quality::Low => Quality::Normal,
            Quality::Normal => Quality::High,
            Quality::High => Quality::Low,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quality::Low => "low",
            Quality::Normal => "normal",
            Quality::High => "high",
        })
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "1" => Ok(Quality::Low),
            "normal" | "2" => Ok(Quality::Normal),
            "high" | "3" => Ok(Quality::High),
            _ => Err(format!("unknown quality: {s}")),
        }
    }
}

/// How strongly live stars tint the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkyLighting {
    None,
    Dim,
    #[default]
    Normal,
}

impl SkyLighting {
    pub const fn level(self) -> u8 {
        match self {
            SkyLighting::None => 0,
            SkyLighting::Dim => 1,
            SkyLighting::Normal => 2,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            SkyLighting::None => SkyLighting::Dim,
            SkyLighting::Dim => SkyLighting::Normal,
            SkyLighting::Normal => SkyLighting::None,
        }
    }
}

impl fmt::Display for SkyLighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkyLighting::None => "none",
            SkyLighting::Dim => "dim",
            SkyLighting::Normal => "normal",
        })
    }
}

impl FromStr for SkyLighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" | "0" => Ok(SkyLighting::None),
            "dim" | "1" => Ok(SkyLighting::Dim),
            "normal" | "2" => Ok(SkyLighting::Normal),
            _ => Err(format!("unknown sky lighting: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    pub quality: Quality,
    pub shell: ShellType,
    /// Shell size selector, 0 (3") to 4 (12"). Fractions are allowed.
    pub size: f32,
    pub auto_launch: bool,
    pub finale: bool,
    pub sky_lighting: SkyLighting,
    /// Keep trails on screen much longer.
    pub long_exposure: bool,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            quality: Quality::Normal,
            shell: ShellType::Random,
            size: 3.0,
            auto_launch: true,
            finale: false,
            sky_lighting: SkyLighting::Normal,
            long_exposure: false,
        }
    }
}

/// The part of [`ShowConfig`] that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PersistedData {
    quality: Quality,
    size: f32,
    sky_lighting: SkyLighting,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigDocument {
    schema_version: String,
    data: PersistedData,
}

impl ShowConfig {
    /// Coerce every field into its valid range. Returns `true` if anything
    /// had to change.
    pub fn validate(&mut self) -> bool {
        let size = if self.size.is_finite() {
            self.size.clamp(0.0, MAX_SIZE)
        } else {
            Self::default().size
        };
        let changed = size != self.size;
        if changed {
            warn!(size = self.size, coerced = size, "shell size out of range");
            self.size = size;
        }
        changed
    }

    /// Load the persisted subset on top of the defaults. A missing file is
    /// not an error.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        info!(?path, "config loaded");
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        info!(?path, "config saved");
        Ok(())
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        let document = ConfigDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            data: PersistedData {
                quality: self.quality,
                size: self.size,
                sky_lighting: self.sky_lighting,
            },
        };
        Ok(toml::to_string_pretty(&document)?)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let document: ConfigDocument = toml::from_str(contents)?;
        if document.schema_version != SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema(document.schema_version));
        }
        let mut config = Self {
            quality: document.data.quality,
            size: document.data.size,
            sky_lighting: document.data.sky_lighting,
            ..Self::default()
        };
        config.validate();
        Ok(config)
    }
}
