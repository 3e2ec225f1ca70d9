use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::LanguageHints;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Linear contrast stretch around a midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub gain: f32,
    pub midpoint: f32,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self { gain: 1.5, midpoint: 128.0 }
    }
}

/// Settings for the receipt pipeline. Every field has a default, so an empty
/// TOML document is a valid config.
///
/// ```toml
/// review_threshold = 50.0
/// tessdata_path = "/usr/share/tesseract-ocr/5/tessdata"
///
/// [languages]
/// primary = "jpn"
/// secondary = "eng"
///
/// [contrast]
/// gain = 1.5
/// midpoint = 128.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub languages: LanguageHints,
    pub contrast: ContrastConfig,
    /// Results below this recognizer confidence (0–100) should be confirmed by the user.
    pub review_threshold: f32,
    pub tessdata_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: LanguageHints::default(),
            contrast: ContrastConfig::default(),
            review_threshold: 50.0,
            tessdata_path: None,
        }
    }
}

impl OcrConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: OcrConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.contrast;
        if !c.gain.is_finite() || c.gain <= 0.0 {
            return Err(ConfigError::Invalid(format!("contrast.gain must be > 0, got {}", c.gain)));
        }
        if !(0.0..=255.0).contains(&c.midpoint) {
            return Err(ConfigError::Invalid(format!(
                "contrast.midpoint must be within 0..=255, got {}",
                c.midpoint
            )));
        }
        if !(0.0..=100.0).contains(&self.review_threshold) {
            return Err(ConfigError::Invalid(format!(
                "review_threshold must be within 0..=100, got {}",
                self.review_threshold
            )));
        }
        Ok(())
    }
}
