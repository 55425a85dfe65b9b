//! First- and second-order specular reflections via the image-source method.
//!
//! First order mirrors the listener across each surface found around the
//! source and checks that the ray toward that image really reflects off the
//! same surface. Second order mirrors the source and the listener across two
//! different surfaces, intersects the line between the two images with both
//! planes, and validates the three legs of the resulting path.

use crate::acoustics::PropagationPath;
use crate::acoustics::surfaces::{NORMAL_TOLERANCE, PLANE_EPSILON};
use crate::math::{Vec3, intersect_line_plane, mirror_across_plane};
use crate::scene::{CollisionOracle, RayHit, RayQuery};

/// Offset along the surface normal applied to reflection points, so that
/// follow-up queries start off the surface.
pub const SURFACE_OFFSET: f32 = 0.001;

/// First-order reflections closer than this to the source are rejected.
pub const MIN_REFLECTION_DISTANCE: f32 = 0.01;

/// Candidates whose direction is this close to parallel with a plane are dropped.
pub const GRAZING_THRESHOLD: f32 = 0.001;

/// Second-order legs shorter than this are rejected.
pub const MIN_LEG_DISTANCE: f32 = 0.001;

/// Tolerance when comparing a query's hit point with the expected point.
pub const POINT_TOLERANCE: f32 = 0.01;

fn is_grazing(direction: Vec3, normal: Vec3) -> bool {
    direction.dot(normal).abs() < GRAZING_THRESHOLD
}

fn lands_on(hit: &RayHit, expected_point: Vec3, expected_normal: Vec3) -> bool {
    hit.hit
        && hit.normal.normalize_or_zero().dot(expected_normal) > NORMAL_TOLERANCE
        && hit.point.distance(expected_point) < POINT_TOLERANCE
}

/// Pair of plane intersections describing a candidate second-order path.
#[derive(Debug, Clone, Copy)]
struct SecondOrderCandidate {
    source_normal: Vec3,
    listener_normal: Vec3,
    /// Reflection point on the source-side plane
    source_point: Vec3,
    /// Reflection point on the listener-side plane
    listener_point: Vec3,
}

/// Finds image-source reflections between one source and one listener.
pub struct ImageSourceFinder<'a> {
    oracle: &'a dyn CollisionOracle,
    source: Vec3,
    listener: Vec3,
    /// Energy retained per reflection
    absorption: f32,
    max_distance: f32,
}

impl<'a> ImageSourceFinder<'a> {
    pub fn new(
        oracle: &'a dyn CollisionOracle,
        source: Vec3,
        listener: Vec3,
        absorption: f32,
        max_distance: f32,
    ) -> Self {
        Self {
            oracle,
            source,
            listener,
            absorption,
            max_distance,
        }
    }

    /// First-order reflections off the surfaces found around the source.
    ///
    /// Each accepted path also passed a visibility check from its reflection
    /// point to the listener. Results are in surface order and not deduplicated.
    pub fn first_order(&self, source_surfaces: &[RayHit]) -> Vec<PropagationPath> {
        let mut surfaces = Vec::with_capacity(source_surfaces.len());
        let mut queries = Vec::with_capacity(source_surfaces.len());

        for surface in source_surfaces {
            let image = mirror_across_plane(self.listener, surface.point, surface.normal);
            let direction = (image - self.source).normalize_or_zero();
            if direction == Vec3::ZERO || is_grazing(direction, surface.normal) {
                log::trace!("Skipping grazing first-order candidate on {:?}", surface.point);
                continue;
            }
            surfaces.push(surface);
            queries.push(RayQuery::new(self.source, direction, self.max_distance));
        }

        let hits = self.oracle.cast_batch(&queries);

        let candidates: Vec<PropagationPath> = surfaces
            .iter()
            .zip(hits.iter())
            .filter(|(surface, hit)| {
                hit.hit
                    && hit.distance > MIN_REFLECTION_DISTANCE
                    && hit.same_plane(surface, NORMAL_TOLERANCE, PLANE_EPSILON)
            })
            .map(|(_, hit)| {
                PropagationPath::new(
                    hit.point + hit.normal * SURFACE_OFFSET,
                    hit.distance,
                    self.absorption,
                )
            })
            .collect();

        // The reflection point must see the listener
        let visibility: Vec<RayQuery> = candidates
            .iter()
            .map(|path| RayQuery::segment(path.image_position, self.listener))
            .collect();
        let blockers = self.oracle.cast_batch(&visibility);

        let paths: Vec<PropagationPath> = candidates
            .into_iter()
            .zip(blockers.iter())
            .filter(|(_, blocker)| !blocker.hit)
            .map(|(path, _)| path)
            .collect();

        log::trace!(
            "First order: {} surfaces, {} candidates, {} visible",
            source_surfaces.len(),
            queries.len(),
            paths.len()
        );
        paths
    }

    /// Second-order reflections: source-side surface first, then listener-side.
    ///
    /// Pairs of surfaces with the same orientation are skipped, since a path
    /// cannot reflect twice off one plane.
    pub fn second_order(
        &self,
        source_surfaces: &[RayHit],
        listener_surfaces: &[RayHit],
    ) -> Vec<PropagationPath> {
        let mut candidates = Vec::new();

        for source_plane in source_surfaces {
            let source_image =
                mirror_across_plane(self.source, source_plane.point, source_plane.normal);

            for listener_plane in listener_surfaces {
                if source_plane.normal.dot(listener_plane.normal) > NORMAL_TOLERANCE {
                    continue;
                }
                let listener_image = mirror_across_plane(
                    self.listener,
                    listener_plane.point,
                    listener_plane.normal,
                );
                if let Some(candidate) =
                    Self::second_order_candidate(source_image, listener_image, source_plane, listener_plane)
                {
                    candidates.push(candidate);
                }
            }
        }

        // Three legs per candidate: source -> source plane, listener -> listener
        // plane, source plane -> listener plane
        let mut queries = Vec::with_capacity(candidates.len() * 3);
        for candidate in &candidates {
            queries.push(RayQuery::new(
                self.source,
                candidate.source_point - self.source,
                self.max_distance,
            ));
            queries.push(RayQuery::new(
                self.listener,
                candidate.listener_point - self.listener,
                self.max_distance,
            ));
            queries.push(RayQuery::new(
                candidate.source_point + candidate.source_normal * SURFACE_OFFSET,
                candidate.listener_point - candidate.source_point,
                self.max_distance,
            ));
        }
        let hits = self.oracle.cast_batch(&queries);

        let paths: Vec<PropagationPath> = candidates
            .iter()
            .zip(hits.chunks_exact(3))
            .filter_map(|(candidate, legs)| self.validate_second_order(candidate, legs))
            .collect();

        log::trace!(
            "Second order: {} x {} surfaces, {} candidates, {} validated",
            source_surfaces.len(),
            listener_surfaces.len(),
            candidates.len(),
            paths.len()
        );
        paths
    }

    fn second_order_candidate(
        source_image: Vec3,
        listener_image: Vec3,
        source_plane: &RayHit,
        listener_plane: &RayHit,
    ) -> Option<SecondOrderCandidate> {
        let direction = (listener_image - source_image).normalize_or_zero();
        if direction == Vec3::ZERO
            || is_grazing(direction, source_plane.normal)
            || is_grazing(direction, listener_plane.normal)
        {
            return None;
        }

        let source_point = intersect_line_plane(
            source_image,
            direction,
            source_plane.point,
            source_plane.normal,
        )?;
        let listener_point = intersect_line_plane(
            source_image,
            direction,
            listener_plane.point,
            listener_plane.normal,
        )?;

        Some(SecondOrderCandidate {
            source_normal: source_plane.normal,
            listener_normal: listener_plane.normal,
            source_point,
            listener_point,
        })
    }

    fn validate_second_order(
        &self,
        candidate: &SecondOrderCandidate,
        legs: &[RayHit],
    ) -> Option<PropagationPath> {
        let (to_source_plane, to_listener_plane, between) = (&legs[0], &legs[1], &legs[2]);

        if [to_source_plane, to_listener_plane, between]
            .iter()
            .any(|leg| !leg.hit || leg.distance < MIN_LEG_DISTANCE)
        {
            return None;
        }
        if !lands_on(to_source_plane, candidate.source_point, candidate.source_normal)
            || !lands_on(to_listener_plane, candidate.listener_point, candidate.listener_normal)
            || !lands_on(between, candidate.listener_point, candidate.listener_normal)
        {
            return None;
        }

        // The between leg starts SURFACE_OFFSET off the source plane
        let image_leg = candidate.source_point.distance(between.point);
        Some(PropagationPath::new(
            to_listener_plane.point + to_listener_plane.normal * SURFACE_OFFSET,
            to_source_plane.distance + image_leg,
            self.absorption * self.absorption,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::{DirectionSampler, probe_surfaces};
    use crate::scene::{Aabb, AnalyticScene, Surface};

    fn floor_scene() -> AnalyticScene {
        AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y))
    }

    #[test]
    fn test_first_order_off_floor() {
        let scene = floor_scene();
        let source = Vec3::new(0.0, 2.0, 0.0);
        let listener = Vec3::new(5.0, 2.0, 0.0);
        let surfaces = probe_surfaces(&scene, &DirectionSampler::new(64), source, 100.0);
        assert_eq!(surfaces.len(), 1);

        let finder = ImageSourceFinder::new(&scene, source, listener, 0.8, 100.0);
        let paths = finder.first_order(&surfaces);

        assert_eq!(paths.len(), 1);
        let path = paths[0];
        assert!(path.valid);
        assert_eq!(path.absorption, 0.8);
        assert!((path.image_position - Vec3::new(2.5, SURFACE_OFFSET, 0.0)).length() < 1e-3);
        // Source -> floor -> listener equals the mirrored source -> listener distance
        let mirrored_source = Vec3::new(0.0, -2.0, 0.0);
        assert!((path.total_distance(listener) - mirrored_source.distance(listener)).abs() < 1e-2);
    }

    #[test]
    fn test_first_order_blocked_from_listener() {
        // A box between the reflection point and the listener hides the reflection
        let scene = floor_scene().with_surface(Surface::Box(Aabb::new(
            Vec3::new(3.5, 0.5, -1.0),
            Vec3::new(4.0, 1.0, 1.0),
        )));
        let source = Vec3::new(0.0, 2.0, 0.0);
        let listener = Vec3::new(5.0, 2.0, 0.0);
        let surfaces = [RayHit::new(Vec3::new(0.0, 0.0, 0.0), Vec3::Y, 2.0)];

        let finder = ImageSourceFinder::new(&scene, source, listener, 0.8, 100.0);
        assert!(finder.first_order(&surfaces).is_empty());
    }

    #[test]
    fn test_grazing_candidate_dropped() {
        // Source and listener both on the plane: the image ray runs along it
        let scene = floor_scene();
        let finder = ImageSourceFinder::new(
            &scene,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            0.8,
            100.0,
        );
        let surfaces = [RayHit::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Y, 1.0)];
        assert!(finder.first_order(&surfaces).is_empty());
    }

    #[test]
    fn test_second_order_floor_then_wall() {
        // Floor at y=0 and a wall at x=10 facing -X
        let scene = floor_scene().with_surface(Surface::plane(Vec3::new(10.0, 0.0, 0.0), -Vec3::X));
        let source = Vec3::new(2.0, 2.0, 0.0);
        let listener = Vec3::new(6.0, 3.0, 0.0);
        let floor = RayHit::new(Vec3::new(2.0, 0.0, 0.0), Vec3::Y, 2.0);
        let wall = RayHit::new(Vec3::new(10.0, 3.0, 0.0), -Vec3::X, 4.0);

        let finder = ImageSourceFinder::new(&scene, source, listener, 0.8, 100.0);
        let paths = finder.second_order(&[floor], &[wall]);

        assert_eq!(paths.len(), 1);
        let path = paths[0];
        assert!((path.absorption - 0.64).abs() < 1e-6);

        // Total length equals the distance between the two images
        let source_image = Vec3::new(2.0, -2.0, 0.0);
        let listener_image = Vec3::new(14.0, 3.0, 0.0);
        let expected = source_image.distance(listener_image);
        assert!((path.total_distance(listener) - expected).abs() < 2e-2);
        // Image sits on the wall, just inside the room
        assert!((path.image_position.x - (10.0 - SURFACE_OFFSET)).abs() < 1e-3);
    }

    #[test]
    fn test_second_order_grazing_pairs_dropped() {
        let scene = floor_scene().with_surface(Surface::plane(Vec3::new(10.0, 0.0, 0.0), -Vec3::X));
        let floor = RayHit::new(Vec3::new(2.0, 0.0, 0.0), Vec3::Y, 2.0);
        let wall = RayHit::new(Vec3::new(10.0, 3.0, 0.0), -Vec3::X, 4.0);

        // Source image (2,-2,0), listener image (14,-2,0): the line runs along the floor
        let along_floor = ImageSourceFinder::new(
            &scene,
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(6.0, -2.0, 0.0),
            0.8,
            100.0,
        );
        assert!(along_floor.second_order(&[floor], &[wall]).is_empty());

        // Source image (14,-2,0), listener image (14,3,0): the line runs along the wall
        let along_wall = ImageSourceFinder::new(
            &scene,
            Vec3::new(14.0, 2.0, 0.0),
            Vec3::new(6.0, 3.0, 0.0),
            0.8,
            100.0,
        );
        assert!(along_wall.second_order(&[floor], &[wall]).is_empty());
    }

    #[test]
    fn test_second_order_same_plane_excluded() {
        let scene = floor_scene();
        let floor = RayHit::new(Vec3::ZERO, Vec3::Y, 2.0);
        let finder = ImageSourceFinder::new(
            &scene,
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(5.0, 2.0, 0.0),
            0.8,
            100.0,
        );
        assert!(finder.second_order(&[floor], &[floor]).is_empty());
    }

    #[test]
    fn test_second_order_in_shoebox_has_floor_ceiling_pairs() {
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 4.0, 8.0));
        let source = Vec3::new(3.0, 1.5, 4.0);
        let listener = Vec3::new(7.0, 1.5, 4.0);
        let sampler = DirectionSampler::new(256);
        let source_surfaces = probe_surfaces(&scene, &sampler, source, 100.0);
        let listener_surfaces = probe_surfaces(&scene, &sampler, listener, 100.0);

        let finder = ImageSourceFinder::new(&scene, source, listener, 0.8, 100.0);
        let paths = finder.second_order(&source_surfaces, &listener_surfaces);

        assert!(!paths.is_empty());
        for path in &paths {
            assert!(path.valid);
            assert!(path.total_distance(listener) > source.distance(listener));
        }
    }
}
