//! Pipeline configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Dimensions, Rgb, TransferMode};

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_QUALITY: u32 = 10;
pub const MAX_QUALITY: u32 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pool size and admission capacity.
    pub workers: usize,

    /// Output size. Both must be known before the first frame is dispatched.
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Sample interval for palette quantization; lower is better and slower.
    pub quality: u32,

    /// -1 plays once, 0 loops forever, n loops n times.
    pub repeat: i32,

    /// Color rendered as transparent, `0xRRGGBB`.
    pub transparent: Option<Rgb>,

    /// Verbose logging requested.
    pub debug: bool,

    /// Move pixel buffers to workers instead of copying them.
    pub zero_copy: bool,

    /// Keep a copy of the last submitted frame so frames can opt into
    /// inter-frame encoding. Off: opted-in frames get no previous buffer.
    pub inter_frame: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
            repeat: 0,
            transparent: None,
            debug: false,
            zero_copy: false,
            inter_frame: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if !(1..=MAX_QUALITY).contains(&self.quality) {
            return Err(ConfigError::Invalid(format!(
                "quality must be within 1..={MAX_QUALITY}, got {}",
                self.quality
            )));
        }
        if self.repeat < -1 {
            return Err(ConfigError::Invalid(format!(
                "repeat must be -1 or greater, got {}",
                self.repeat
            )));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ConfigError::Invalid("width and height must be non-zero".into()));
        }
        if let Some(Rgb(c)) = self.transparent
            && c > 0xFF_FF_FF
        {
            return Err(ConfigError::Invalid(format!(
                "transparent color {c:#x} is not 0xRRGGBB"
            )));
        }
        Ok(())
    }

    /// Output dimensions, if both are set.
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        }
    }

    pub fn transfer_mode(&self) -> TransferMode {
        if self.zero_copy {
            TransferMode::Move
        } else {
            TransferMode::Copy
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}
