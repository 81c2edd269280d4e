// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fusion pipeline composition root.
//!
//! Owns and wires the temporal stabilizer, surface registry, wall
//! classifier and visibility state machine; every collaborator is
//! injected at construction time. Raster arrivals and tracking deltas
//! are handed in by direct synchronous calls, and `update` runs one
//! interval-gated fusion pass: stabilize, classify the tracked surfaces,
//! update visibility.

use crate::classifier::{ClassificationVerdict, WallClassifier};
use crate::error::Result;
use crate::registry::SurfaceRegistry;
use crate::stabilizer::TemporalStabilizer;
use crate::visibility::{VisibilityRecord, VisibilityStateMachine};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wallsense_core::{CameraView, FusionConfig, SegmentationRaster, SurfaceDelta, SurfaceId};

/// Why a call to [`FusionPipeline::update`] did not run a fusion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The minimum update interval has not elapsed yet.
    Throttled,
    /// No raster has arrived from the inference engine yet.
    NoRaster,
    /// No (valid) camera view was available this tick.
    NoCamera,
}

/// Result of one `update` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Ran(FusionDiagnostics),
}

/// Observability counts for one completed fusion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionDiagnostics {
    /// Surfaces currently known to the registry.
    pub total_surfaces: usize,
    /// Tracking surfaces passing the orientation gate.
    pub vertical_surfaces: usize,
    /// Surfaces currently visible as walls.
    pub wall_surfaces: usize,
    /// Surfaces fully reclassified this tick.
    pub classified_this_tick: usize,
}

/// Tick-driven fusion of segmentation rasters and tracked surfaces.
pub struct FusionPipeline {
    config: FusionConfig,
    stabilizer: TemporalStabilizer,
    registry: SurfaceRegistry,
    classifier: WallClassifier,
    visibility: VisibilityStateMachine,
    /// At most one in-flight raster per tick; a newer arrival replaces an
    /// unconsumed one.
    pending_raster: Option<SegmentationRaster>,
    last_tick_at: Option<Duration>,
    /// Round-robin position for the per-tick classification budget.
    cursor: Option<SurfaceId>,
    diagnostics: FusionDiagnostics,
}

impl FusionPipeline {
    /// Build the pipeline, validating the configuration up front.
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;
        let stabilizer = TemporalStabilizer::new(
            config.stabilization_frame_count,
            config.stabilization_decay,
            config.stabilization_enabled,
        );
        let classifier = WallClassifier::new(config.clone());
        let visibility = VisibilityStateMachine::new(config.base_opacity);
        Ok(Self {
            config,
            stabilizer,
            registry: SurfaceRegistry::new(),
            classifier,
            visibility,
            pending_raster: None,
            last_tick_at: None,
            cursor: None,
            diagnostics: FusionDiagnostics::default(),
        })
    }

    /// Hand over a completed inference raster.
    ///
    /// The raster is consumed into the stabilization ring on the next
    /// fusion pass; until then it stays valid as "the latest raster".
    pub fn submit_raster(&mut self, raster: SegmentationRaster) {
        if self.pending_raster.is_some() {
            tracing::debug!("replacing unconsumed raster with a newer arrival");
        }
        self.pending_raster = Some(raster);
    }

    /// Apply one batch of tracking-subsystem deltas.
    ///
    /// Removed surfaces lose their visibility records immediately. A
    /// duplicate add is returned as an error without corrupting state.
    pub fn apply_delta(&mut self, delta: SurfaceDelta) -> Result<()> {
        let removed = self.registry.apply_delta(delta)?;
        for id in removed {
            self.visibility.remove(id);
        }
        Ok(())
    }

    /// Run one fusion pass if the update interval has elapsed.
    ///
    /// `now` is host-provided monotonic time. Passing `None` for the
    /// camera (or an invalid view) skips classification for this tick;
    /// visibility then retains its prior state.
    pub fn update(&mut self, now: Duration, camera: Option<&CameraView>) -> TickOutcome {
        let interval = Duration::from_secs_f64(self.config.update_interval_secs);
        if let Some(last) = self.last_tick_at {
            if now < last + interval {
                return TickOutcome::Skipped(SkipReason::Throttled);
            }
        }
        self.last_tick_at = Some(now);

        if let Some(raster) = self.pending_raster.take() {
            self.stabilizer.push(raster);
        }
        for id in self.registry.evict_stopped() {
            self.visibility.remove(id);
        }

        let Some(stabilized) = self.stabilizer.stabilized() else {
            tracing::debug!("no raster received yet, skipping classification");
            return TickOutcome::Skipped(SkipReason::NoRaster);
        };
        let Some(view) = camera.filter(|v| v.is_valid()) else {
            tracing::debug!("no valid camera view, skipping classification");
            return TickOutcome::Skipped(SkipReason::NoCamera);
        };

        // Fair round-robin over the tracking set: rotate past the cursor,
        // fully classify up to the budget, cheaply reconfirm the rest.
        let mut ids: Vec<SurfaceId> = self.registry.all_tracking().map(|s| s.id).collect();
        ids.sort_unstable();
        if let Some(cursor) = self.cursor {
            if !ids.is_empty() {
                let start = ids.partition_point(|id| *id <= cursor) % ids.len();
                ids.rotate_left(start);
            }
        }
        let budget = self.config.max_surfaces_per_tick.min(ids.len());
        let (selected, skipped) = ids.split_at(budget);

        // Independent surfaces share no mutable state; classify in
        // parallel over read-only views.
        let registry = &self.registry;
        let classifier = &self.classifier;
        let verdicts: Vec<ClassificationVerdict> = selected
            .par_iter()
            .filter_map(|id| {
                registry
                    .get(*id)
                    .and_then(|surface| classifier.classify(surface, &stabilized, view))
            })
            .collect();

        let classified = verdicts.len();
        for verdict in &verdicts {
            self.visibility.apply_verdict(verdict);
        }
        for id in skipped {
            if self.visibility.is_visible(*id) {
                self.visibility.reconfirm(*id);
            }
        }
        if let Some(last) = selected.last() {
            self.cursor = Some(*last);
        }
        self.visibility.finish_tick();

        let diagnostics = FusionDiagnostics {
            total_surfaces: self.registry.len(),
            vertical_surfaces: self
                .registry
                .all_tracking()
                .filter(|s| self.classifier.is_vertical_candidate(s))
                .count(),
            wall_surfaces: self.visibility.visible_count(),
            classified_this_tick: classified,
        };
        self.diagnostics = diagnostics;
        tracing::debug!(
            total = diagnostics.total_surfaces,
            vertical = diagnostics.vertical_surfaces,
            walls = diagnostics.wall_surfaces,
            classified = diagnostics.classified_this_tick,
            "fusion pass complete"
        );
        TickOutcome::Ran(diagnostics)
    }

    /// The renderer-facing output: one record per known surface.
    pub fn records(&self) -> impl Iterator<Item = VisibilityRecord> + '_ {
        self.visibility.records()
    }

    /// Current record for one surface, if any.
    pub fn record(&self, id: SurfaceId) -> Option<VisibilityRecord> {
        self.visibility.record(id)
    }

    /// Records for surfaces currently visible as walls.
    pub fn visible_walls(&self) -> Vec<VisibilityRecord> {
        self.visibility.records().filter(|r| r.visible).collect()
    }

    /// Counts from the most recent completed fusion pass.
    pub fn diagnostics(&self) -> FusionDiagnostics {
        self.diagnostics
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Release every buffered raster and all per-surface state.
    ///
    /// Used when the host disables the pipeline; the next session starts
    /// from a clean ring.
    pub fn reset(&mut self) {
        self.stabilizer.clear();
        self.pending_raster = None;
        self.last_tick_at = None;
        self.cursor = None;
        self.diagnostics = FusionDiagnostics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix4, Point2, Point3, UnitQuaternion, Vector3};
    use wallsense_core::{Alignment, Surface, TrackingState};

    fn config() -> FusionConfig {
        FusionConfig {
            class_match_tolerance: 0.02,
            wall_confidence_threshold: 0.5,
            update_interval_secs: 0.25,
            ..FusionConfig::default()
        }
    }

    fn wall_surface(id: u64) -> Surface {
        Surface {
            id: SurfaceId(id),
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
            boundary: vec![
                Point2::new(-1.0, -1.0),
                Point2::new(1.0, -1.0),
                Point2::new(1.0, 1.0),
                Point2::new(-1.0, 1.0),
            ],
            local_bounds: None,
            normal: Vector3::z_axis(),
            alignment: Alignment::Vertical,
            tracking_state: TrackingState::Tracking,
        }
    }

    fn all_wall_raster() -> SegmentationRaster {
        SegmentationRaster::new(
            100,
            100,
            vec![9.0 / 255.0; 100 * 100],
            vec![0.8; 100 * 100],
        )
        .unwrap()
    }

    fn view() -> CameraView {
        CameraView::new(Matrix4::identity(), 100, 100)
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_update_is_interval_gated() {
        let mut pipeline = FusionPipeline::new(config()).unwrap();
        pipeline.submit_raster(all_wall_raster());

        assert!(matches!(
            pipeline.update(secs(0.0), Some(&view())),
            TickOutcome::Ran(_)
        ));
        assert_eq!(
            pipeline.update(secs(0.1), Some(&view())),
            TickOutcome::Skipped(SkipReason::Throttled)
        );
        assert!(matches!(
            pipeline.update(secs(0.3), Some(&view())),
            TickOutcome::Ran(_)
        ));
    }

    #[test]
    fn test_no_raster_skips_classification() {
        let mut pipeline = FusionPipeline::new(config()).unwrap();
        pipeline.apply_delta(SurfaceDelta {
            added: vec![wall_surface(1)],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            pipeline.update(secs(0.0), Some(&view())),
            TickOutcome::Skipped(SkipReason::NoRaster)
        );
        assert!(pipeline.record(SurfaceId(1)).is_none());
    }

    #[test]
    fn test_no_camera_skips_classification() {
        let mut pipeline = FusionPipeline::new(config()).unwrap();
        pipeline.submit_raster(all_wall_raster());
        assert_eq!(
            pipeline.update(secs(0.0), None),
            TickOutcome::Skipped(SkipReason::NoCamera)
        );
    }

    #[test]
    fn test_duplicate_add_surfaces_as_error() {
        let mut pipeline = FusionPipeline::new(config()).unwrap();
        pipeline.apply_delta(SurfaceDelta {
            added: vec![wall_surface(1)],
            ..Default::default()
        })
        .unwrap();
        let result = pipeline.apply_delta(SurfaceDelta {
            added: vec![wall_surface(1)],
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_budget_round_robin_covers_all_surfaces() {
        let mut pipeline = FusionPipeline::new(FusionConfig {
            max_surfaces_per_tick: 1,
            update_interval_secs: 0.0,
            ..config()
        })
        .unwrap();
        pipeline.apply_delta(SurfaceDelta {
            added: vec![wall_surface(1), wall_surface(2), wall_surface(3)],
            ..Default::default()
        })
        .unwrap();

        // Three ticks at budget one: every surface gets classified once,
        // and already-visible walls are reconfirmed in between.
        for tick in 0..3 {
            pipeline.submit_raster(all_wall_raster());
            let outcome = pipeline.update(secs(tick as f64), Some(&view()));
            match outcome {
                TickOutcome::Ran(d) => assert_eq!(d.classified_this_tick, 1),
                other => panic!("expected a run, got {other:?}"),
            }
        }
        assert_eq!(pipeline.visible_walls().len(), 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = FusionPipeline::new(FusionConfig {
            base_opacity: 2.0,
            ..FusionConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_releases_buffers() {
        let mut pipeline = FusionPipeline::new(config()).unwrap();
        pipeline.submit_raster(all_wall_raster());
        pipeline.update(secs(0.0), Some(&view()));
        pipeline.reset();
        assert_eq!(
            pipeline.update(secs(10.0), Some(&view())),
            TickOutcome::Skipped(SkipReason::NoRaster)
        );
    }
}
