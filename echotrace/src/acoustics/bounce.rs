use crate::acoustics::image_source::{MIN_LEG_DISTANCE, POINT_TOLERANCE, SURFACE_OFFSET};
use crate::acoustics::surfaces::NORMAL_TOLERANCE;
use crate::acoustics::{DirectionSampler, PropagationPath};
use crate::math::{Vec3, reflect};
use crate::scene::{CollisionOracle, RayHit, RayQuery};

/// Progress of one sampled ray through the bounce chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayState {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Distance travelled from the source up to `origin`
    pub accumulated_distance: f32,
    /// Energy retained after all bounces so far
    pub absorption: f32,
    pub alive: bool,
}

impl RayState {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            accumulated_distance: 0.0,
            absorption: 1.0,
            alive: true,
        }
    }
}

/// Traces specular bounce chains from the source and keeps every bounce point
/// the listener can see.
///
/// Every sampled direction starts one ray. Each iteration moves all live rays
/// forward by one bounce; a ray dies as soon as it finds nothing to hit.
pub struct MultiBounceTracer<'a> {
    oracle: &'a dyn CollisionOracle,
    listener: Vec3,
    bounce_count: usize,
    initial_absorption: f32,
    reflection_absorption: f32,
    max_distance: f32,
}

impl<'a> MultiBounceTracer<'a> {
    pub fn new(oracle: &'a dyn CollisionOracle, listener: Vec3, bounce_count: usize) -> Self {
        Self {
            oracle,
            listener,
            bounce_count,
            initial_absorption: 0.3,
            reflection_absorption: 0.8,
            max_distance: 1000.0,
        }
    }

    /// Absorption after the first bounce and the factor applied per further bounce.
    pub fn with_absorption(mut self, initial: f32, per_bounce: f32) -> Self {
        self.initial_absorption = initial;
        self.reflection_absorption = per_bounce;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Runs the bounce chain for every direction of `sampler`.
    ///
    /// Paths are grouped by bounce order, and within one order follow the
    /// sampler's direction order.
    pub fn trace(&self, source: Vec3, sampler: &DirectionSampler) -> Vec<PropagationPath> {
        let mut rays: Vec<RayState> = sampler
            .directions()
            .iter()
            .map(|&direction| RayState::new(source, direction))
            .collect();
        let mut paths = Vec::new();

        for bounce in 0..self.bounce_count {
            let live: Vec<usize> = (0..rays.len()).filter(|&i| rays[i].alive).collect();
            if live.is_empty() {
                log::trace!("All bounce rays terminated after {} iterations", bounce);
                break;
            }

            let queries: Vec<RayQuery> = live
                .iter()
                .map(|&i| RayQuery::new(rays[i].origin, rays[i].direction, self.max_distance))
                .collect();
            let bounce_hits = self.oracle.cast_batch(&queries);

            let mut bounced: Vec<(usize, RayHit)> = Vec::with_capacity(live.len());
            for (&i, hit) in live.iter().zip(bounce_hits) {
                let ray = &mut rays[i];
                if !hit.hit || hit.distance < MIN_LEG_DISTANCE {
                    ray.alive = false;
                    continue;
                }
                ray.accumulated_distance += hit.distance;
                ray.absorption = if bounce == 0 {
                    self.initial_absorption
                } else {
                    ray.absorption * self.reflection_absorption
                };
                bounced.push((i, hit));
            }

            let visibility: Vec<RayQuery> = bounced
                .iter()
                .map(|(_, hit)| {
                    RayQuery::new(self.listener, hit.point - self.listener, self.max_distance)
                })
                .collect();
            let seen = self.oracle.cast_batch(&visibility);

            let before = paths.len();
            for ((i, hit), from_listener) in bounced.iter().zip(seen.iter()) {
                let ray = &mut rays[*i];
                if self.listener_sees(hit, from_listener) {
                    paths.push(PropagationPath::new(
                        hit.point,
                        ray.accumulated_distance,
                        ray.absorption,
                    ));
                }
                ray.direction = reflect(ray.direction, hit.normal).normalize_or_zero();
                ray.origin = hit.point + hit.normal * SURFACE_OFFSET;
            }

            log::trace!(
                "Bounce {}: {} live rays, {} hits, {} visible from listener",
                bounce + 1,
                live.len(),
                bounced.len(),
                paths.len() - before
            );
        }

        paths
    }

    fn listener_sees(&self, bounce: &RayHit, from_listener: &RayHit) -> bool {
        from_listener.hit
            && from_listener.point.distance(bounce.point) < POINT_TOLERANCE
            && from_listener.normal.dot(bounce.normal) > NORMAL_TOLERANCE
    }
}
