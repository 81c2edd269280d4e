// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tracked surface model reported by the spatial-tracking subsystem.

use nalgebra::{Point2, Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable unique identifier assigned by the tracking subsystem.
///
/// Never reused while the surface lives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tracking lifecycle state reported per surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    /// Actively tracked; eligible for classification.
    Tracking,
    /// Temporarily paused; kept but not classified.
    Paused,
    /// Tracking lost; evicted after one full update cycle.
    Stopped,
}

/// Surface orientation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Vertical,
    Horizontal,
    Unknown,
}

impl Alignment {
    /// Derive alignment from a world-space normal.
    ///
    /// Vertical surfaces have a near-horizontal normal: `|n . up|` below
    /// `vertical_threshold`. Near-vertical normals are horizontal
    /// surfaces; everything in between is `Unknown`.
    pub fn from_normal(normal: &Unit<Vector3<f64>>, vertical_threshold: f64) -> Self {
        let up_dot = normal.dot(&Vector3::y_axis()).abs();
        if up_dot < vertical_threshold {
            Alignment::Vertical
        } else if up_dot > 1.0 - vertical_threshold {
            Alignment::Horizontal
        } else {
            Alignment::Unknown
        }
    }
}

/// Axis-aligned local-space extents carried by mesh-type surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl LocalBounds {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// True when the bounds span no area in any direction.
    pub fn is_zero(&self) -> bool {
        let h = self.half_extents();
        h.x <= 0.0 && h.y <= 0.0 && h.z <= 0.0
    }
}

/// A tracked planar or mesh region in 3D space.
///
/// Created on the first "added" event from the tracking subsystem,
/// mutated in place on "updated" events, destroyed on "removed" events or
/// after lingering in [`TrackingState::Stopped`].
#[derive(Debug, Clone)]
pub struct Surface {
    pub id: SurfaceId,
    /// Origin of the surface's local frame in world space.
    pub position: Point3<f64>,
    /// Rotation of the surface's local frame.
    pub rotation: UnitQuaternion<f64>,
    /// Boundary polygon in local plane space; empty for mesh surfaces.
    pub boundary: Vec<Point2<f64>>,
    /// Local-space extents; carried by mesh surfaces instead of a boundary.
    pub local_bounds: Option<LocalBounds>,
    /// World-space unit normal.
    pub normal: Unit<Vector3<f64>>,
    pub alignment: Alignment,
    pub tracking_state: TrackingState,
}

impl Surface {
    /// Transform a local-space point into world space.
    #[inline]
    pub fn local_to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// The surface normal expressed in the surface's local frame.
    pub fn local_normal(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.rotation.inverse() * self.normal.into_inner())
    }

    /// True when the surface carries no usable geometry: an empty
    /// boundary and absent or zero-area bounds.
    pub fn is_degenerate(&self) -> bool {
        self.boundary.is_empty() && self.local_bounds.map_or(true, |b| b.is_zero())
    }
}

/// One batch of tracking-subsystem changes, delivered per tracking update.
#[derive(Debug, Clone, Default)]
pub struct SurfaceDelta {
    pub added: Vec<Surface>,
    pub updated: Vec<Surface>,
    pub removed: Vec<SurfaceId>,
}

impl SurfaceDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_alignment_from_normal() {
        // Wall-like: normal points along +Z, orthogonal to up.
        let n = Vector3::z_axis();
        assert_eq!(Alignment::from_normal(&n, 0.4), Alignment::Vertical);

        // Floor-like: normal points straight up.
        let n = Vector3::y_axis();
        assert_eq!(Alignment::from_normal(&n, 0.4), Alignment::Horizontal);

        // Ramp-like: neither clearly vertical nor horizontal.
        let n = Unit::new_normalize(Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(Alignment::from_normal(&n, 0.4), Alignment::Unknown);
    }

    #[test]
    fn test_local_to_world_applies_pose() {
        let mut surface = wall_surface(1);
        surface.position = Point3::new(1.0, 2.0, 3.0);
        surface.rotation =
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);

        // Local +X maps to world -Z under a 90 degree yaw.
        let p = surface.local_to_world(&Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
        assert!((p.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_geometry() {
        let mut surface = wall_surface(1);
        assert!(!surface.is_degenerate());

        surface.boundary.clear();
        assert!(surface.is_degenerate());

        surface.local_bounds = Some(LocalBounds::new(Point3::origin(), Point3::origin()));
        assert!(surface.is_degenerate());

        surface.local_bounds = Some(LocalBounds::new(
            Point3::new(-0.5, -0.5, 0.0),
            Point3::new(0.5, 0.5, 0.0),
        ));
        assert!(!surface.is_degenerate());
    }
}
