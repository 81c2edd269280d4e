// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for the fusion pipeline.

use crate::error::{Error, Result};
use crate::raster::normalized_class;
use serde::{Deserialize, Serialize};

/// Tuning parameters for the whole fusion pipeline.
///
/// All fields have deployment-tested defaults; hosts typically override a
/// handful via [`FusionConfig::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Verticality gate for surfaces with unknown alignment:
    /// `|dot(normal, up)|` must stay below this value.
    pub vertical_threshold: f64,
    /// Confidence-channel threshold above which a pixel counts as wall.
    pub wall_confidence_threshold: f32,
    /// Tolerance around the normalized wall class id for a class match.
    pub class_match_tolerance: f32,
    /// Minimum seconds between fusion passes.
    pub update_interval_secs: f64,
    /// Ring-buffer capacity for temporal stabilization.
    pub stabilization_frame_count: usize,
    /// Per-step weight decay across the stabilization ring.
    pub stabilization_decay: f32,
    /// Temporal stabilization toggle; pass-through when false.
    pub stabilization_enabled: bool,
    /// Maximum surfaces fully reclassified per tick.
    pub max_surfaces_per_tick: usize,
    /// Opacity floor for visible walls.
    pub base_opacity: f32,
    /// Discrete semantic class id that denotes "wall" in the raster.
    pub wall_class_id: u8,
    /// Sample grid spread as a fraction of the surface half-extent.
    pub extent_fraction: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vertical_threshold: 0.4,
            wall_confidence_threshold: 0.1,
            class_match_tolerance: 0.1,
            update_interval_secs: 0.25,
            stabilization_frame_count: 4,
            stabilization_decay: 0.3,
            stabilization_enabled: true,
            max_surfaces_per_tick: 4,
            base_opacity: 0.4,
            wall_class_id: 9,
            extent_fraction: 0.4,
        }
    }
}

impl FusionConfig {
    /// Parse and validate a configuration from a JSON string.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The configured wall class id in its normalized raster encoding.
    pub fn wall_class_norm(&self) -> f32 {
        normalized_class(self.wall_class_id)
    }

    /// Reject out-of-range values before they reach the pipeline.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vertical_threshold) {
            return Err(Error::InvalidConfig(format!(
                "vertical_threshold must be within 0..1, got {}",
                self.vertical_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.wall_confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "wall_confidence_threshold must be within 0..1, got {}",
                self.wall_confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.base_opacity) {
            return Err(Error::InvalidConfig(format!(
                "base_opacity must be within 0..1, got {}",
                self.base_opacity
            )));
        }
        if self.class_match_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "class_match_tolerance must be non-negative, got {}",
                self.class_match_tolerance
            )));
        }
        if self.update_interval_secs < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "update_interval_secs must be non-negative, got {}",
                self.update_interval_secs
            )));
        }
        if self.stabilization_frame_count == 0 {
            return Err(Error::InvalidConfig(
                "stabilization_frame_count must be at least 1".into(),
            ));
        }
        if self.stabilization_decay < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "stabilization_decay must be non-negative, got {}",
                self.stabilization_decay
            )));
        }
        if self.max_surfaces_per_tick == 0 {
            return Err(Error::InvalidConfig(
                "max_surfaces_per_tick must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.extent_fraction) {
            return Err(Error::InvalidConfig(format!(
                "extent_fraction must be within 0..1, got {}",
                self.extent_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FusionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_with_overrides() {
        let config = FusionConfig::from_json(
            r#"{ "wall_class_id": 12, "stabilization_frame_count": 6 }"#,
        )
        .unwrap();
        assert_eq!(config.wall_class_id, 12);
        assert_eq!(config.stabilization_frame_count, 6);
        // Untouched fields keep their defaults.
        assert_eq!(config.max_surfaces_per_tick, 4);
    }

    #[test]
    fn test_from_json_rejects_out_of_range() {
        let result = FusionConfig::from_json(r#"{ "base_opacity": 1.5 }"#);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = FusionConfig::from_json(r#"{ "stabilization_frame_count": 0 }"#);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_wall_class_norm() {
        let config = FusionConfig::default();
        assert!((config.wall_class_norm() - 9.0 / 255.0).abs() < 1e-6);
    }
}
