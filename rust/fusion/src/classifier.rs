// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-surface wall classification against the stabilized raster.
//!
//! Stateless and re-entrant: a verdict is recomputed every tick and never
//! persisted here. Persistence across ticks (hysteresis, grace periods)
//! is the visibility state machine's job.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use wallsense_core::{
    project_to_raster, sample_pattern, CameraView, FusionConfig, StabilizedRaster, Surface,
    SurfaceId,
};

/// Wall/not-wall decision for one surface on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub surface_id: SurfaceId,
    pub is_wall: bool,
    /// Maximum confidence observed among matching wall pixels (0..1).
    pub confidence: f32,
    /// Fraction of valid sample points that matched the wall class.
    pub sampled_ratio: f32,
}

impl ClassificationVerdict {
    fn not_wall(surface_id: SurfaceId) -> Self {
        Self {
            surface_id,
            is_wall: false,
            confidence: 0.0,
            sampled_ratio: 0.0,
        }
    }
}

/// Decides wall/not-wall per surface by sampling the stabilized raster.
///
/// Holds only configuration; `classify` is safe to call concurrently for
/// independent surfaces.
#[derive(Debug, Clone)]
pub struct WallClassifier {
    config: FusionConfig,
}

impl WallClassifier {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Classify one surface against the stabilized raster.
    ///
    /// Returns `None` when every sample point projects off-screen: the
    /// surface is not classified this tick and keeps its previous verdict
    /// downstream. Degenerate and non-vertical surfaces get a definite
    /// not-wall verdict without sampling.
    pub fn classify(
        &self,
        surface: &Surface,
        raster: &StabilizedRaster,
        view: &CameraView,
    ) -> Option<ClassificationVerdict> {
        if surface.is_degenerate() || !self.is_vertical_candidate(surface) {
            return Some(ClassificationVerdict::not_wall(surface.id));
        }

        // Thresholds scale with the accumulated blend weight so that the
        // decision is invariant under repeated-identical-frame blending.
        let weight = raster.weight();
        let wall_class = self.config.wall_class_norm() * weight;
        let tolerance = self.config.class_match_tolerance * weight;
        let confidence_floor = self.config.wall_confidence_threshold * weight;

        let mut valid = 0usize;
        let mut wall_pixels = 0usize;
        let mut max_confidence = 0.0f32;

        for local in sample_pattern(surface, self.config.extent_fraction) {
            let world = surface.local_to_world(&local);
            let Some((x, y)) = project_to_raster(&world, view, raster.width(), raster.height())
            else {
                continue;
            };
            valid += 1;

            let class = raster.class_at(x, y);
            let confidence = raster.confidence_at(x, y);
            if (class - wall_class).abs() <= tolerance || confidence > confidence_floor {
                wall_pixels += 1;
                max_confidence = max_confidence.max(confidence);
            }
        }

        if valid == 0 {
            return None;
        }

        // Strict majority: exactly half is not a wall.
        let is_wall = wall_pixels * 2 > valid;
        let confidence = if wall_pixels > 0 {
            (max_confidence / weight).min(1.0)
        } else {
            0.0
        };

        Some(ClassificationVerdict {
            surface_id: surface.id,
            is_wall,
            confidence,
            sampled_ratio: wall_pixels as f32 / valid as f32,
        })
    }

    /// Orientation gate: reported alignment wins; unknown alignment falls
    /// back to the world-up dot test on the surface normal.
    pub fn is_vertical_candidate(&self, surface: &Surface) -> bool {
        use wallsense_core::Alignment;
        match surface.alignment {
            Alignment::Vertical => true,
            Alignment::Horizontal => false,
            Alignment::Unknown => {
                surface.normal.dot(&Vector3::y_axis()).abs() < self.config.vertical_threshold
            }
        }
    }
}
