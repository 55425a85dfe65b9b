//! Scene geometry seam for the propagation simulation.
//!
//! The simulation only talks to geometry through the [`CollisionOracle`] trait.
//! Bring your own implementation (physics engine, BVH, GPU tracer) or use the
//! bundled [`AnalyticScene`] of planes and boxes.
//!
//! # Example
//!
//! ```
//! use echotrace::math::Vec3;
//! use echotrace::scene::{AnalyticScene, CollisionOracle, RayQuery, Surface};
//!
//! let scene = AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y));
//! let hits = scene.cast_batch(&[RayQuery::new(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 10.0)]);
//! assert!(hits[0].hit);
//! ```

pub mod analytic;
pub mod ray_tracer;

pub use analytic::{Aabb, AnalyticScene, Surface};
pub use ray_tracer::{CollisionOracle, RayHit, RayQuery};
