use crate::acoustics::DirectionSampler;
use crate::math::Vec3;
use crate::scene::{CollisionOracle, RayHit, RayQuery};

/// Minimum normal dot product for two hits to count as the same orientation.
pub const NORMAL_TOLERANCE: f32 = 0.999;

/// Maximum plane offset for two hits to count as the same plane.
pub const PLANE_EPSILON: f32 = 0.01;

/// Collapses hits that land on the same physical plane into one representative.
///
/// The scan is quadratic in the number of accepted hits, which stays small:
/// it is bounded by the number of distinct surfaces around one point, not by
/// scene size.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateHitFilter {
    pub normal_tolerance: f32,
    pub plane_epsilon: f32,
}

impl Default for DuplicateHitFilter {
    fn default() -> Self {
        Self {
            normal_tolerance: NORMAL_TOLERANCE,
            plane_epsilon: PLANE_EPSILON,
        }
    }
}

impl DuplicateHitFilter {
    /// Returns the first hit seen on every distinct plane, in input order.
    /// Misses are dropped.
    pub fn filter(&self, raw_hits: &[RayHit]) -> Vec<RayHit> {
        let mut unique: Vec<RayHit> = Vec::new();
        for hit in raw_hits.iter().filter(|hit| hit.hit) {
            let duplicate = unique.iter().any(|accepted| {
                hit.same_plane(accepted, self.normal_tolerance, self.plane_epsilon)
            });
            if !duplicate {
                unique.push(*hit);
            }
        }
        unique
    }
}

/// Casts one ray along every sampled direction from `origin` and returns the
/// distinct surfaces found.
pub fn probe_surfaces(
    oracle: &dyn CollisionOracle,
    sampler: &DirectionSampler,
    origin: Vec3,
    max_distance: f32,
) -> Vec<RayHit> {
    let queries: Vec<RayQuery> = sampler
        .directions()
        .iter()
        .map(|&direction| RayQuery::new(origin, direction, max_distance))
        .collect();
    let raw_hits = oracle.cast_batch(&queries);
    let surfaces = DuplicateHitFilter::default().filter(&raw_hits);
    log::trace!(
        "Probed {} directions around {:?}: {} hits, {} distinct surfaces",
        queries.len(),
        origin,
        raw_hits.iter().filter(|hit| hit.hit).count(),
        surfaces.len()
    );
    surfaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::AnalyticScene;

    #[test]
    fn test_same_plane_hits_collapse() {
        let hits = [
            RayHit::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Y, 2.0),
            RayHit::new(Vec3::new(-3.0, 0.004, 2.0), Vec3::new(0.0, 1.0, 0.01).normalize(), 3.0),
        ];
        let unique = DuplicateHitFilter::default().filter(&hits);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0], hits[0]);
    }

    #[test]
    fn test_distinct_planes_survive() {
        let hits = [
            RayHit::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Y, 2.0),
            RayHit::new(Vec3::new(5.0, 1.0, 0.0), -Vec3::X, 3.0),
            // Parallel but offset plane
            RayHit::new(Vec3::new(1.0, 3.0, 0.0), Vec3::Y, 1.0),
            RayHit::miss(),
        ];
        let unique = DuplicateHitFilter::default().filter(&hits);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[1].normal, -Vec3::X);
    }

    #[test]
    fn test_probe_shoebox_finds_six_walls() {
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 3.0, 8.0));
        let sampler = DirectionSampler::new(256);
        let surfaces = probe_surfaces(&scene, &sampler, Vec3::new(3.0, 1.5, 4.0), 100.0);
        assert_eq!(surfaces.len(), 6);
    }

    #[test]
    fn test_probe_empty_scene() {
        let scene = AnalyticScene::new();
        let sampler = DirectionSampler::new(32);
        assert!(probe_surfaces(&scene, &sampler, Vec3::ZERO, 100.0).is_empty());
    }
}
