// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deterministic sample patterns and raster-coordinate projection.
//!
//! Each surface is sampled with a fixed 3x3 grid (the centroid sits at
//! the middle cell) spread over a fraction of its local half-extents,
//! with every point projected onto the surface plane so it is guaranteed
//! to lie on the surface. Projection into the raster is a pure function
//! with no side effects, safe to run in parallel across surfaces.

use crate::camera::CameraView;
use crate::surface::Surface;
use nalgebra::{Point3, Unit, Vector3};
use smallvec::SmallVec;

/// Number of points in the fixed sample pattern (3x3 grid).
pub const PATTERN_POINTS: usize = 9;

/// Local-space sample points for one surface.
pub type SamplePattern = SmallVec<[Point3<f64>; PATTERN_POINTS]>;

/// Generate the local-space sample pattern for a surface.
///
/// `extent_fraction` scales the grid spread relative to the half-extent;
/// the grid cells sit at offsets `{-1, 0, +1} * extent_fraction * half`
/// along each local plane axis. Degenerate surfaces produce an empty
/// pattern.
pub fn sample_pattern(surface: &Surface, extent_fraction: f64) -> SamplePattern {
    let mut points = SamplePattern::new();
    if surface.is_degenerate() {
        return points;
    }

    let (center, half_x, half_y) = local_extents(surface);
    let normal = surface.local_normal();

    for iy in -1i32..=1 {
        for ix in -1i32..=1 {
            let p = Point3::new(
                center.x + ix as f64 * extent_fraction * half_x,
                center.y + iy as f64 * extent_fraction * half_y,
                center.z,
            );
            points.push(project_onto_plane(&p, &center, &normal));
        }
    }
    points
}

/// Centroid and half-extents of the surface in local plane space.
fn local_extents(surface: &Surface) -> (Point3<f64>, f64, f64) {
    if !surface.boundary.is_empty() {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in &surface.boundary {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let center = Point3::new((min_x + max_x) * 0.5, (min_y + max_y) * 0.5, 0.0);
        (center, (max_x - min_x) * 0.5, (max_y - min_y) * 0.5)
    } else if let Some(bounds) = surface.local_bounds {
        let half = bounds.half_extents();
        (bounds.center(), half.x, half.y)
    } else {
        (Point3::origin(), 0.0, 0.0)
    }
}

/// Project a local point onto the plane through `origin` with `normal`.
fn project_onto_plane(
    p: &Point3<f64>,
    origin: &Point3<f64>,
    normal: &Unit<Vector3<f64>>,
) -> Point3<f64> {
    let offset = (p - origin).dot(normal);
    p - normal.into_inner() * offset
}

/// Map a world-space sample point into raster pixel coordinates.
///
/// The viewport pixel position is scaled into raster space by the
/// `raster / viewport` ratio. Points outside the viewport were already
/// rejected by [`CameraView::world_to_viewport`]; in-bounds points are
/// clamped to `[0, dim - 1]` after scaling to guard against rounding at
/// the borders.
pub fn project_to_raster(
    world: &Point3<f64>,
    view: &CameraView,
    raster_width: u32,
    raster_height: u32,
) -> Option<(u32, u32)> {
    let [px, py] = view.world_to_viewport(world)?;
    let sx = raster_width as f64 / view.viewport_width as f64;
    let sy = raster_height as f64 / view.viewport_height as f64;
    let rx = ((px * sx).floor() as i64).clamp(0, raster_width as i64 - 1);
    let ry = ((py * sy).floor() as i64).clamp(0, raster_height as i64 - 1);
    Some((rx as u32, ry as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Alignment, LocalBounds, SurfaceId, TrackingState};
    use nalgebra::{Matrix4, Point2, UnitQuaternion};

    fn planar_surface() -> Surface {
        Surface {
            id: SurfaceId(1),
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

    fn unit_view(width: u32, height: u32) -> CameraView {
        CameraView::new(Matrix4::identity(), width, height)
    }

    #[test]
    fn test_pattern_is_nine_points_on_the_plane() {
        let surface = planar_surface();
        let pattern = sample_pattern(&surface, 0.4);
        assert_eq!(pattern.len(), PATTERN_POINTS);
        for p in &pattern {
            assert!(p.z.abs() < 1e-12, "point off the local plane: {p:?}");
            assert!(p.x.abs() <= 0.4 + 1e-12);
            assert!(p.y.abs() <= 0.4 + 1e-12);
        }
        // Centroid is the middle cell.
        assert!(pattern[4].coords.norm() < 1e-12);
    }

    #[test]
    fn test_pattern_is_deterministic() {
        let surface = planar_surface();
        let a = sample_pattern(&surface, 0.4);
        let b = sample_pattern(&surface, 0.4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pattern_from_mesh_bounds() {
        let mut surface = planar_surface();
        surface.boundary.clear();
        surface.local_bounds = Some(LocalBounds::new(
            Point3::new(0.0, 0.0, -0.1),
            Point3::new(2.0, 4.0, 0.1),
        ));
        let pattern = sample_pattern(&surface, 0.5);
        assert_eq!(pattern.len(), PATTERN_POINTS);
        // Grid centered on the bounds center, projected to its plane.
        assert!((pattern[4].x - 1.0).abs() < 1e-12);
        assert!((pattern[4].y - 2.0).abs() < 1e-12);
        assert!(pattern[4].z.abs() < 1e-12);
        // Spread is half-extent * fraction: 1.0 * 0.5 and 2.0 * 0.5.
        assert!((pattern[0].x - 0.5).abs() < 1e-12);
        assert!((pattern[0].y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_surface_yields_empty_pattern() {
        let mut surface = planar_surface();
        surface.boundary.clear();
        assert!(sample_pattern(&surface, 0.4).is_empty());
    }

    #[test]
    fn test_in_viewport_points_land_inside_raster() {
        // Property: any projection that survives the viewport test lies
        // within [0, w-1] x [0, h-1] after scaling into the raster.
        let view = unit_view(640, 480);
        let (rw, rh) = (100, 80);
        let mut checked = 0;
        for ix in -10..=10 {
            for iy in -10..=10 {
                let world = Point3::new(ix as f64 / 10.0, iy as f64 / 10.0, 0.0);
                if let Some((x, y)) = project_to_raster(&world, &view, rw, rh) {
                    assert!(x < rw && y < rh, "({x}, {y}) outside {rw}x{rh}");
                    checked += 1;
                }
            }
        }
        // The whole grid is inside NDC, so every point must have mapped.
        assert_eq!(checked, 21 * 21);
    }

    #[test]
    fn test_border_projection_clamps_not_overflows() {
        let view = unit_view(100, 100);
        // NDC exactly +1 maps to viewport pixel 100; the raster clamp
        // brings it back to 99.
        let (x, y) = project_to_raster(&Point3::new(1.0, -1.0, 0.0), &view, 100, 100).unwrap();
        assert_eq!((x, y), (99, 99));
    }

    #[test]
    fn test_off_viewport_points_are_rejected() {
        let view = unit_view(100, 100);
        assert!(project_to_raster(&Point3::new(1.2, 0.0, 0.0), &view, 100, 100).is_none());
    }

    #[test]
    fn test_raster_scaling_uses_viewport_ratio() {
        // 200x200 viewport down to a 100x100 raster: center pixel halves.
        let view = unit_view(200, 200);
        let (x, y) = project_to_raster(&Point3::new(0.0, 0.0, 0.0), &view, 100, 100).unwrap();
        assert_eq!((x, y), (50, 50));
    }
}
