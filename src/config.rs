use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconstruct::{AssetMatching, FontName, ReconstructOptions};
use crate::Viewport;

const CONFIG_DIR: &str = "h2d";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub viewport: Viewport,
    pub timeouts: Timeouts,
    pub capture: CaptureConfig,
    pub reconstruct: ReconstructConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub process: Duration,
    #[serde(with = "humantime_serde")]
    pub image_load: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            network_idle: Duration::from_secs(10),
            process: Duration::from_secs(45),
            image_load: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Serialized capture size above which asset bytes are dropped.
    pub max_payload_chars: usize,
    pub max_image_bytes: u64,
    pub fetch_images: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_payload_chars: crate::protocol::DEFAULT_MAX_PAYLOAD_CHARS,
            max_image_bytes: crate::browser::DEFAULT_MAX_IMAGE_BYTES,
            fetch_images: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconstructConfig {
    pub use_auto_layout: bool,
    pub asset_matching: AssetMatching,
    pub fallback_font_family: String,
    pub fallback_font_style: String,
    pub default_viewport: Viewport,
    /// Families the in-memory host offers besides its built-in ones.
    pub fonts: Vec<String>,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        let font = FontName::default();
        Self {
            use_auto_layout: false,
            asset_matching: AssetMatching::default(),
            fallback_font_family: font.family,
            fallback_font_style: font.style,
            default_viewport: Viewport::SCENE_FALLBACK,
            fonts: Vec::new(),
        }
    }
}

impl ReconstructConfig {
    pub fn options(&self) -> ReconstructOptions {
        ReconstructOptions {
            use_auto_layout: self.use_auto_layout,
            asset_matching: self.asset_matching,
            fallback_font: FontName::new(&self.fallback_font_family, &self.fallback_font_style),
            default_viewport: self.default_viewport,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            timeouts: Timeouts::default(),
            capture: CaptureConfig::default(),
            reconstruct: ReconstructConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, else the central config file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$XDG_CONFIG_HOME/h2d/config.toml`, or `~/.config/h2d/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .filter(|dir| !dir.is_empty())
                    .map(|home| PathBuf::from(home).join(".config"))
            })?;
        Some(base.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.viewport.has_area() {
            return Err(ConfigError::Invalid(
                "viewport width and height must be positive".to_string(),
            ));
        }
        if !self.reconstruct.default_viewport.has_area() {
            return Err(ConfigError::Invalid(
                "reconstruct.default_viewport width and height must be positive".to_string(),
            ));
        }
        let timeouts = [
            ("navigation", self.timeouts.navigation),
            ("network_idle", self.timeouts.network_idle),
            ("process", self.timeouts.process),
            ("image_load", self.timeouts.image_load),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| value.is_zero()) {
            return Err(ConfigError::Invalid(format!(
                "timeouts.{name} must be greater than zero"
            )));
        }
        if self.capture.max_payload_chars == 0 {
            return Err(ConfigError::Invalid(
                "capture.max_payload_chars must be greater than zero".to_string(),
            ));
        }
        if self.capture.max_image_bytes == 0 {
            return Err(ConfigError::Invalid(
                "capture.max_image_bytes must be greater than zero".to_string(),
            ));
        }
        if self.reconstruct.fallback_font_family.trim().is_empty()
            || self.reconstruct.fallback_font_style.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "reconstruct fallback font family and style must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
