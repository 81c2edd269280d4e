// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data model and projection math for semantic wall fusion.
//!
//! This crate holds the pure, stateless half of the system:
//!
//! - [`SegmentationRaster`] / [`StabilizedRaster`] — per-pixel class and
//!   confidence snapshots from the external segmentation model.
//! - [`Surface`] and friends — the tracked-surface model delivered by the
//!   external spatial-tracking subsystem.
//! - [`CameraView`] and the sampling functions — deterministic sample
//!   patterns projected into raster coordinates.
//! - [`FusionConfig`] — tuning parameters shared by every pipeline stage.
//!
//! The stateful pipeline (stabilizer, registry, classifier, visibility)
//! lives in `wallsense-fusion`.

pub mod camera;
pub mod config;
pub mod error;
pub mod raster;
pub mod sampling;
pub mod surface;

// Re-export commonly used types
pub use camera::CameraView;
pub use config::FusionConfig;
pub use error::{Error, Result};
pub use raster::{normalized_class, SegmentationRaster, StabilizedRaster};
pub use sampling::{project_to_raster, sample_pattern, SamplePattern, PATTERN_POINTS};
pub use surface::{
    Alignment, LocalBounds, Surface, SurfaceDelta, SurfaceId, TrackingState,
};
