//! Collision query interface consumed by the propagation simulation.
//!
//! The simulation never intersects geometry itself. It issues batches of
//! [`RayQuery`] values against a user-provided [`CollisionOracle`] and reads the
//! resulting [`RayHit`] values positionally.

use crate::math::Vec3;
use rayon::prelude::*;

/// Result of a ray intersection test.
///
/// Returned by `CollisionOracle::cast_ray()` to provide hit information to the
/// propagation simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Whether the ray hit any geometry
    pub hit: bool,

    /// Hit position in world space
    ///
    /// Only meaningful if `hit` is true
    pub point: Vec3,

    /// Surface normal at the hit point (normalized, facing the ray origin)
    ///
    /// Only meaningful if `hit` is true
    pub normal: Vec3,

    /// Distance from ray origin to hit point (in meters)
    ///
    /// Only meaningful if `hit` is true
    pub distance: f32,
}

impl RayHit {
    /// Creates a miss result (no hit)
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            distance: 0.0,
        }
    }

    /// Creates a hit result
    pub fn new(point: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            hit: true,
            point,
            normal,
            distance,
        }
    }

    /// True if both hits lie on the same oriented plane: normals within
    /// `normal_tolerance` (dot product) and plane offset below `plane_epsilon`.
    pub fn same_plane(&self, other: &RayHit, normal_tolerance: f32, plane_epsilon: f32) -> bool {
        let a = self.normal.normalize_or_zero();
        let b = other.normal.normalize_or_zero();
        if a.dot(b) <= normal_tolerance {
            return false;
        }
        (self.point - other.point).dot(b).abs() < plane_epsilon
    }
}

impl Default for RayHit {
    fn default() -> Self {
        Self::miss()
    }
}

/// A single ray to test against the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayQuery {
    pub origin: Vec3,
    /// Unit direction, or zero for a degenerate query that always misses
    pub direction: Vec3,
    pub max_distance: f32,
}

impl RayQuery {
    /// Creates a query, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
        }
    }

    /// Query from `origin` toward `target`, limited to the segment between them.
    pub fn segment(origin: Vec3, target: Vec3) -> Self {
        let delta = target - origin;
        Self::new(origin, delta, delta.length())
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3::ZERO || !(self.max_distance > 0.0)
    }
}

/// Trait for providing ray intersection queries to the propagation simulation.
///
/// Implement this trait to integrate your own collision system with EchoTrace
/// (a physics engine, a BVH, a GPU tracer...).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: batches are fanned out across the
/// rayon thread pool, so `cast_ray` is called concurrently.
///
/// # Example
///
/// ```
/// use echotrace::math::Vec3;
/// use echotrace::scene::{CollisionOracle, RayHit};
///
/// struct Floor;
///
/// impl CollisionOracle for Floor {
///     fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> RayHit {
///         if direction.y >= 0.0 || origin.y <= 0.0 {
///             return RayHit::miss();
///         }
///         let t = -origin.y / direction.y;
///         if t > max_distance {
///             return RayHit::miss();
///         }
///         RayHit::new(origin + direction * t, Vec3::Y, t)
///     }
/// }
/// ```
pub trait CollisionOracle: Send + Sync {
    /// Test if a ray intersects any geometry.
    ///
    /// # Parameters
    ///
    /// * `origin` - Ray starting position in world space (meters)
    /// * `direction` - Ray direction (normalized)
    /// * `max_distance` - Maximum ray distance to test (meters)
    ///
    /// # Notes
    ///
    /// - If multiple surfaces are hit, return the **closest** hit
    /// - The surface normal should face the ray origin
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> RayHit;

    /// Runs a batch of independent queries and returns one hit per query, in
    /// query order.
    ///
    /// The default implementation fans the batch out over rayon and returns
    /// once every query has completed. Degenerate queries (zero direction or
    /// non-positive range) report a miss without reaching `cast_ray`.
    fn cast_batch(&self, queries: &[RayQuery]) -> Vec<RayHit> {
        queries
            .par_iter()
            .map(|query| {
                if query.is_degenerate() {
                    RayHit::miss()
                } else {
                    self.cast_ray(query.origin, query.direction, query.max_distance)
                }
            })
            .collect()
    }
}
