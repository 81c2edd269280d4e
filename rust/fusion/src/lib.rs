// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporal stabilization, wall classification and visibility pipeline.
//!
//! This crate fuses a streaming per-pixel segmentation raster with a
//! dynamically tracked set of 3D surfaces to decide, tick by tick, which
//! surfaces are walls, and keeps that decision visually stable despite
//! per-frame classifier noise. The stages, leaves first:
//!
//! 1. [`TemporalStabilizer`] — ring of recent rasters, decay-weighted
//!    blending.
//! 2. [`SurfaceRegistry`] — live surface set fed by tracking deltas.
//! 3. [`WallClassifier`] — sample, project, majority-vote per surface.
//! 4. [`VisibilityStateMachine`] — hysteresis into show/hide + opacity.
//! 5. [`FusionPipeline`] — composition root driving one pass per tick.
//!
//! The pure data model and projection math live in `wallsense-core`.

pub mod classifier;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod stabilizer;
pub mod visibility;

// Re-export commonly used types
pub use classifier::{ClassificationVerdict, WallClassifier};
pub use error::{Error, Result};
pub use pipeline::{FusionDiagnostics, FusionPipeline, SkipReason, TickOutcome};
pub use registry::SurfaceRegistry;
pub use stabilizer::TemporalStabilizer;
pub use visibility::{VisibilityRecord, VisibilityStateMachine};
