// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification raster snapshots produced by the segmentation model.
//!
//! A [`SegmentationRaster`] is an immutable snapshot of one completed
//! inference: per-pixel class and confidence channels stored as flat
//! row-major buffers. A [`StabilizedRaster`] has the same shape but holds
//! decay-weighted accumulated values produced by the temporal stabilizer,
//! together with the total blend weight so that consumers can scale their
//! thresholds instead of renormalizing the buffers.

use crate::error::{Error, Result};

/// Convert a discrete class id to its normalized 0-1 raster encoding.
///
/// The segmentation model encodes class ids as `id / 255` in the class
/// channel; id 9 maps to ~0.035.
pub fn normalized_class(id: u8) -> f32 {
    id as f32 / 255.0
}

/// Immutable snapshot of one classification frame.
///
/// Owned exclusively by the producer until handed to the stabilizer,
/// which takes ownership into its ring buffer.
#[derive(Debug, Clone)]
pub struct SegmentationRaster {
    width: u32,
    height: u32,
    class_values: Box<[f32]>,
    confidence: Box<[f32]>,
}

impl SegmentationRaster {
    /// Build a raster from raw channel buffers.
    ///
    /// This is the rejection point for malformed inference output: zero
    /// dimensions and buffer-length mismatches fail here, leaving any
    /// previously stabilized raster untouched downstream.
    pub fn new(
        width: u32,
        height: u32,
        class_values: Vec<f32>,
        confidence: Vec<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyRaster { width, height });
        }
        let expected = width as usize * height as usize;
        if class_values.len() != expected {
            return Err(Error::ChannelLengthMismatch {
                channel: "class",
                expected,
                actual: class_values.len(),
            });
        }
        if confidence.len() != expected {
            return Err(Error::ChannelLengthMismatch {
                channel: "confidence",
                expected,
                actual: confidence.len(),
            });
        }
        Ok(Self {
            width,
            height,
            class_values: class_values.into_boxed_slice(),
            confidence: confidence.into_boxed_slice(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn class_values(&self) -> &[f32] {
        &self.class_values
    }

    pub fn confidence_values(&self) -> &[f32] {
        &self.confidence
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }

    /// Class channel value at pixel `(x, y)`.
    #[inline]
    pub fn class_at(&self, x: u32, y: u32) -> f32 {
        self.class_values[self.index(x, y)]
    }

    /// Confidence channel value at pixel `(x, y)`.
    #[inline]
    pub fn confidence_at(&self, x: u32, y: u32) -> f32 {
        self.confidence[self.index(x, y)]
    }
}

/// Derived, noise-reduced raster produced by the temporal stabilizer.
///
/// Channels hold raw accumulated (non-renormalized) values; `weight` is
/// the total blend weight that went into the accumulation. Thresholding
/// callers multiply their per-pixel thresholds by `weight`, which makes
/// repeated-identical-input blending threshold-invariant while keeping
/// the "recent frames dominate, older frames fade" bias of the weights.
/// Replace-on-write: a fresh value is produced every update.
#[derive(Debug, Clone)]
pub struct StabilizedRaster {
    width: u32,
    height: u32,
    class_values: Box<[f32]>,
    confidence: Box<[f32]>,
    weight: f32,
}

impl StabilizedRaster {
    /// Build from accumulated channel buffers. Callers (the stabilizer)
    /// guarantee the buffers match the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        class_values: Vec<f32>,
        confidence: Vec<f32>,
        weight: f32,
    ) -> Self {
        debug_assert_eq!(class_values.len(), width as usize * height as usize);
        debug_assert_eq!(confidence.len(), width as usize * height as usize);
        Self {
            width,
            height,
            class_values: class_values.into_boxed_slice(),
            confidence: confidence.into_boxed_slice(),
            weight,
        }
    }

    /// Pass-through conversion: a single raw raster at full weight.
    pub fn from_raw(raster: &SegmentationRaster) -> Self {
        Self {
            width: raster.width,
            height: raster.height,
            class_values: raster.class_values.clone(),
            confidence: raster.confidence.clone(),
            weight: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total blend weight accumulated into the channels.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }

    /// Accumulated class channel value at pixel `(x, y)`.
    #[inline]
    pub fn class_at(&self, x: u32, y: u32) -> f32 {
        self.class_values[self.index(x, y)]
    }

    /// Accumulated confidence channel value at pixel `(x, y)`.
    #[inline]
    pub fn confidence_at(&self, x: u32, y: u32) -> f32 {
        self.confidence[self.index(x, y)]
    }
}
