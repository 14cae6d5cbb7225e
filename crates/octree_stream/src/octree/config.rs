//! LodProfile - per-device LOD thresholds, and the failure retry policy.

use serde::Deserialize;

use super::frustum::{Camera, Visibility};
use super::bounds::BoundingSphere;

/// Per-device LOD thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LodProfile {
  /// Projected pixel size above which a node is split.
  pub split_threshold: f64,

  /// World size of one tolerance unit: size = 2^tolerance * tolerance_scale.
  pub tolerance_scale: f64,

  /// Floor of the camera distance, avoids blow-up inside a node's sphere.
  pub min_distance: f64,
}

impl LodProfile {
  pub const DESKTOP: Self = Self {
    split_threshold: 200.0,
    tolerance_scale: 128.0,
    min_distance: 1e-3,
  };

  /// Coarser LOD for mobile GPUs and bandwidth.
  pub const MOBILE: Self = Self {
    split_threshold: 400.0,
    tolerance_scale: 128.0,
    min_distance: 1e-3,
  };

  /// Geometric size of a node with `tolerance`.
  /// size = 2^tolerance * tolerance_scale
  #[inline]
  pub fn geometric_size(&self, tolerance: i8) -> f64 {
    2f64.powi(tolerance as i32) * self.tolerance_scale
  }

  /// Approximate pixel extent of a node as seen by `camera`.
  #[inline]
  pub fn projected_size(&self, camera: &Camera, tolerance: i8, sphere: &BoundingSphere) -> f64 {
    camera.projected_size(self.geometric_size(tolerance), sphere, self.min_distance)
  }

  /// The root always splits; other nodes split when visible and large.
  #[inline]
  pub fn should_split(&self, is_root: bool, visibility: Visibility, projected_size: f64) -> bool {
    is_root || (visibility != Visibility::None && projected_size > self.split_threshold)
  }
}

impl Default for LodProfile {
  fn default() -> Self {
    Self::DESKTOP
  }
}

/// How often a node whose request failed is tried again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FailurePolicy {
  /// Failed attempts after which a node stops requesting until its parent
  /// collapses it (0 = retry forever, on every evaluation).
  pub max_attempts: u32,
}

impl FailurePolicy {
  pub const UNLIMITED: Self = Self { max_attempts: 0 };

  #[inline]
  pub fn allows_retry(&self, failures: u32) -> bool {
    self.max_attempts == 0 || failures < self.max_attempts
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
