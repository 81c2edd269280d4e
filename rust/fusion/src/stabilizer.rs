// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporal stabilization of classification rasters.
//!
//! Suppresses per-frame classifier flicker by blending the current raster
//! with up to `N` previous rasters held in a fixed-capacity ring. The
//! raster written `i` steps ago contributes with weight
//! `max(0, 1 - decay * i / N)`: the current frame always contributes at
//! full weight, older frames fade. Accumulation is additive per channel
//! and never renormalized; the produced [`StabilizedRaster`] carries the
//! total blend weight so consumers scale their thresholds instead.

use wallsense_core::{SegmentationRaster, StabilizedRaster};

/// Fixed-capacity ring of recent rasters with a rotating write cursor.
#[derive(Debug)]
pub struct TemporalStabilizer {
    slots: Vec<Option<SegmentationRaster>>,
    /// Next write position.
    cursor: usize,
    decay: f32,
    enabled: bool,
    dimensions: Option<(u32, u32)>,
}

impl TemporalStabilizer {
    /// Create a stabilizer with `frame_count` ring slots.
    ///
    /// With `enabled = false` the stabilizer passes the most recent raw
    /// raster through unblended.
    pub fn new(frame_count: usize, decay: f32, enabled: bool) -> Self {
        Self {
            slots: vec![None; frame_count.max(1)],
            cursor: 0,
            decay,
            enabled,
            dimensions: None,
        }
    }

    /// Store a new raw raster, advancing the write cursor.
    ///
    /// A dimension change invalidates every buffered frame: the ring is
    /// reinitialized before the new raster is stored.
    pub fn push(&mut self, raster: SegmentationRaster) {
        let dims = (raster.width(), raster.height());
        if let Some(current) = self.dimensions {
            if current != dims {
                tracing::info!(
                    old_width = current.0,
                    old_height = current.1,
                    new_width = dims.0,
                    new_height = dims.1,
                    "raster dimensions changed, resetting stabilization ring"
                );
                self.clear();
            }
        }
        self.dimensions = Some(dims);
        self.slots[self.cursor] = Some(raster);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Drop every buffered frame and rewind the cursor.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.cursor = 0;
        self.dimensions = None;
    }

    /// True once at least one raster has been received.
    pub fn has_raster(&self) -> bool {
        self.dimensions.is_some()
    }

    /// The most recently pushed raw raster.
    pub fn latest(&self) -> Option<&SegmentationRaster> {
        let n = self.slots.len();
        self.slots[(self.cursor + n - 1) % n].as_ref()
    }

    /// Produce the blended raster for the current tick.
    ///
    /// Returns `None` until the first raster arrives; classification must
    /// be skipped for that tick.
    pub fn stabilized(&self) -> Option<StabilizedRaster> {
        let latest = self.latest()?;
        if !self.enabled {
            return Some(StabilizedRaster::from_raw(latest));
        }

        let n = self.slots.len();
        let newest_index = (self.cursor + n - 1) % n;
        let (width, height) = (latest.width(), latest.height());
        let len = width as usize * height as usize;
        let mut class_acc = vec![0.0f32; len];
        let mut confidence_acc = vec![0.0f32; len];
        let mut total_weight = 0.0f32;

        for steps_ago in 0..n {
            let index = (newest_index + n - steps_ago) % n;
            let Some(raster) = self.slots[index].as_ref() else {
                continue;
            };
            let weight = (1.0 - self.decay * steps_ago as f32 / n as f32).max(0.0);
            if weight <= 0.0 {
                continue;
            }
            for (acc, value) in class_acc.iter_mut().zip(raster.class_values()) {
                *acc += value * weight;
            }
            for (acc, value) in confidence_acc.iter_mut().zip(raster.confidence_values()) {
                *acc += value * weight;
            }
            total_weight += weight;
        }

        Some(StabilizedRaster::new(
            width,
            height,
            class_acc,
            confidence_acc,
            total_weight,
        ))
    }
}
