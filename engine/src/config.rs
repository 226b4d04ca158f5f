//! TOML configuration.
//!
//! ```toml
//! [media]
//! type = "cdr-80"          # or: capacity = "700 MB" / capacity = 734003200
//! cushion_percent = 4.5
//!
//! [fit]
//! algorithm = "worst_fit"  # or: goal = "item-count"
//! ```
//!
//! An explicit capacity wins over a media type, and an explicit algorithm
//! wins over a goal. Command-line flags are applied on top by the caller.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::fit::{FitAlgorithm, FitGoal};
use crate::media::{parse_size, usable_capacity, MediaType, DEFAULT_CUSHION_PERCENT};
use crate::model::capacity_from_signed;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub media: MediaConfig,
    pub fit: FitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub capacity: Option<CapacitySetting>,
    pub cushion_percent: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            media_type: None,
            capacity: None,
            cushion_percent: DEFAULT_CUSHION_PERCENT,
        }
    }
}

/// A capacity given either as a byte count or as text with a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapacitySetting {
    Bytes(i64),
    Text(String),
}

impl CapacitySetting {
    pub fn to_bytes(&self) -> Result<u64, EngineError> {
        match self {
            CapacitySetting::Bytes(bytes) => capacity_from_signed(*bytes),
            CapacitySetting::Text(text) => parse_size(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    pub algorithm: Option<FitAlgorithm>,
    pub goal: Option<FitGoal>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str(&text).map_err(|e| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// Raw capacity of one volume, before the cushion.
    pub fn raw_capacity(&self) -> Result<u64, EngineError> {
        match (&self.media.capacity, self.media.media_type) {
            (Some(capacity), _) => capacity.to_bytes(),
            (None, Some(media)) => Ok(media.capacity_bytes()),
            (None, None) => Err(EngineError::MissingCapacity),
        }
    }

    /// Usable capacity of one volume, after the cushion.
    pub fn resolve_capacity(&self) -> Result<u64, EngineError> {
        usable_capacity(self.raw_capacity()?, self.media.cushion_percent)
    }

    pub fn resolve_algorithm(&self) -> FitAlgorithm {
        self.fit
            .algorithm
            .or_else(|| self.fit.goal.map(|goal| goal.algorithm()))
            .unwrap_or_default()
    }
}
