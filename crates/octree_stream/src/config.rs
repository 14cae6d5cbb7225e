//! StreamConfig - everything tunable about streaming, loadable from TOML.
//!
//! ```toml
//! [lod]
//! split_threshold = 400.0
//!
//! [budget]
//! max_new_per_frame = 4
//!
//! [decode]
//! hidden_objects = [12, 40]
//! ```
//!
//! Missing tables and keys keep their defaults.

use std::path::Path;

use serde::Deserialize;

use crate::octree::{FailurePolicy, LodProfile, RequestBudget};
use crate::pipeline::DecodeOptions;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
  pub lod: LodProfile,
  pub budget: RequestBudget,
  /// Decode options sent with every request.
  pub decode: DecodeOptions,
  pub failure: FailurePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),
}

impl StreamConfig {
  /// Defaults with the coarser mobile LOD profile.
  pub fn mobile() -> Self {
    Self {
      lod: LodProfile::MOBILE,
      ..Self::default()
    }
  }

  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let mut config: Self = toml::from_str(source)?;
    config.decode = DecodeOptions {
      filter_highlighted: config.decode.filter_highlighted,
      ..DecodeOptions::hiding(config.decode.hidden_objects)
    };
    Ok(config)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    Self::from_toml_str(&std::fs::read_to_string(path)?)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
