// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Camera projection into viewport pixel space.
//!
//! The host queries pose/projection from its camera subsystem each tick
//! and hands the pipeline a [`CameraView`]: the combined view-projection
//! matrix plus the current viewport size in pixels.

use nalgebra::{Matrix4, Point3};

/// Snapshot of the camera for one fusion tick.
#[derive(Debug, Clone)]
pub struct CameraView {
    /// Combined view-projection matrix (world space to clip space).
    pub view_projection: Matrix4<f64>,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
}

impl CameraView {
    pub fn new(view_projection: Matrix4<f64>, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            view_projection,
            viewport_width,
            viewport_height,
        }
    }

    /// Returns `true` when the viewport is non-empty and the matrix is finite.
    pub fn is_valid(&self) -> bool {
        self.viewport_width > 0
            && self.viewport_height > 0
            && self.view_projection.iter().all(|v| v.is_finite())
    }

    /// Project a world-space point to viewport pixel coordinates.
    ///
    /// Returns `None` for points behind the camera or outside the
    /// viewport; off-screen points are rejected, never clamped, so they
    /// cannot bias a sampling vote. The returned coordinates lie in
    /// `[0, viewport_width] x [0, viewport_height]` with y pointing down.
    pub fn world_to_viewport(&self, world: &Point3<f64>) -> Option<[f64; 2]> {
        let clip = self.view_projection * world.to_homogeneous();
        if clip.w <= 0.0 {
            return None;
        }
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        if !ndc_x.is_finite() || !ndc_y.is_finite() {
            return None;
        }
        if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) {
            return None;
        }
        let px = (ndc_x + 1.0) * 0.5 * self.viewport_width as f64;
        let py = (1.0 - ndc_y) * 0.5 * self.viewport_height as f64;
        Some([px, py])
    }
}
