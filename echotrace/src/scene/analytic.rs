//! Analytic scene geometry.
//!
//! A small [`CollisionOracle`] made of infinite planes, bounded planes and
//! axis-aligned boxes. Used by the demo and as a deterministic oracle in tests.

use crate::math::Vec3;
use crate::scene::{CollisionOracle, RayHit};

/// Hits closer than this to the ray origin are ignored (self-intersection guard).
const MIN_HIT_DISTANCE: f32 = 1e-4;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, point: Vec3, tolerance: f32) -> bool {
        point.cmpge(self.min - Vec3::splat(tolerance)).all()
            && point.cmple(self.max + Vec3::splat(tolerance)).all()
    }

    /// Slab test. Returns the entry distance and the outward face normal.
    fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut near_normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < f32::EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let mut t0 = (self.min[axis] - o) / d;
            let mut t1 = (self.max[axis] - o) / d;
            let mut normal = Vec3::ZERO;
            normal[axis] = -1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                normal[axis] = 1.0;
            }
            if t0 > t_near {
                t_near = t0;
                near_normal = normal;
            }
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        // Rays starting inside the box are not reported
        if t_near < MIN_HIT_DISTANCE {
            return None;
        }
        Some((t_near, near_normal))
    }
}

/// One piece of analytic geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Plane through `point` with `normal`, optionally clipped to `bounds`
    Plane {
        point: Vec3,
        normal: Vec3,
        bounds: Option<Aabb>,
    },
    /// Solid box (occluder)
    Box(Aabb),
}

impl Surface {
    pub fn plane(point: Vec3, normal: Vec3) -> Self {
        Self::Plane {
            point,
            normal: normal.normalize(),
            bounds: None,
        }
    }

    pub fn bounded_plane(point: Vec3, normal: Vec3, bounds: Aabb) -> Self {
        Self::Plane {
            point,
            normal: normal.normalize(),
            bounds: Some(bounds),
        }
    }

    fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        match *self {
            Surface::Plane {
                point,
                normal,
                bounds,
            } => {
                let denom = direction.dot(normal);
                if denom.abs() < f32::EPSILON {
                    return None;
                }
                let t = (point - origin).dot(normal) / denom;
                if t < MIN_HIT_DISTANCE {
                    return None;
                }
                if let Some(bounds) = bounds {
                    if !bounds.contains(origin + direction * t, 1e-3) {
                        return None;
                    }
                }
                // Report the face the ray arrived on
                let facing = if denom > 0.0 { -normal } else { normal };
                Some((t, facing))
            }
            Surface::Box(aabb) => aabb.intersect(origin, direction),
        }
    }
}

/// A collection of analytic surfaces answering closest-hit queries.
#[derive(Debug, Clone, Default)]
pub struct AnalyticScene {
    surfaces: Vec<Surface>,
}

impl AnalyticScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Six inward-facing walls of a rectangular room spanning `min..max`.
    pub fn shoebox(min: Vec3, max: Vec3) -> Self {
        let bounds = Aabb::new(min, max);
        let (min, max) = (bounds.min, bounds.max);
        let mut scene = Self::new();
        for (point, normal) in [
            (min, Vec3::X),
            (max, -Vec3::X),
            (min, Vec3::Y),
            (max, -Vec3::Y),
            (min, Vec3::Z),
            (max, -Vec3::Z),
        ] {
            scene.add(Surface::bounded_plane(point, normal, bounds));
        }
        scene
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.add(surface);
        self
    }

    pub fn add(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl CollisionOracle for AnalyticScene {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> RayHit {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return RayHit::miss();
        }

        self.surfaces
            .iter()
            .filter_map(|surface| surface.intersect(origin, direction))
            .filter(|(t, _)| *t <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, normal)| RayHit::new(origin + direction * t, normal, t))
            .unwrap_or_else(RayHit::miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_hit_faces_origin() {
        let scene = AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y));

        let from_above = scene.cast_ray(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 100.0);
        assert!(from_above.hit);
        assert!((from_above.distance - 2.0).abs() < 1e-5);
        assert_eq!(from_above.normal, Vec3::Y);

        let from_below = scene.cast_ray(Vec3::new(0.0, -2.0, 0.0), Vec3::Y, 100.0);
        assert!(from_below.hit);
        assert_eq!(from_below.normal, -Vec3::Y);
    }

    #[test]
    fn test_max_distance_limits_hit() {
        let scene = AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y));
        let hit = scene.cast_ray(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 1.0);
        assert!(!hit.hit);
    }

    #[test]
    fn test_box_occludes() {
        let scene = AnalyticScene::new().with_surface(Surface::Box(Aabb::new(
            Vec3::new(4.0, -1.0, -1.0),
            Vec3::new(6.0, 1.0, 1.0),
        )));
        let hit = scene.cast_ray(Vec3::ZERO, Vec3::X, 100.0);
        assert!(hit.hit);
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert_eq!(hit.normal, -Vec3::X);
    }

    #[test]
    fn test_shoebox_closest_wall() {
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 3.0, 8.0));
        assert_eq!(scene.len(), 6);

        let hit = scene.cast_ray(Vec3::new(2.0, 1.5, 4.0), -Vec3::X, 100.0);
        assert!(hit.hit);
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::X);
    }
}
