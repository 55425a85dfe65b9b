//! Propagation path search between one source and one listener.
//!
//! Every tick runs the same pipeline:
//!
//! 1. cast the fixed [`DirectionSampler`] set from the source (and listener)
//!    and collapse hits into distinct surfaces
//! 2. test line of sight for the direct path
//! 3. find first- and second-order reflections with image sources
//! 4. trace multi-bounce chains and keep bounces the listener can see
//! 5. drop duplicates per category
//!
//! All scene access goes through batched [`CollisionOracle`](crate::scene::CollisionOracle)
//! queries. The result is a [`PathSet`] consumed by the binaural renderer.

pub mod bounce;
pub mod dedup;
pub mod direct;
pub mod image_source;
mod path;
mod sampler;
pub mod simulator;
pub mod surfaces;

pub use bounce::{MultiBounceTracer, RayState};
pub use dedup::{DedupKey, ReflectionDeduplicator, dedup_key};
pub use direct::find_direct_path;
pub use image_source::ImageSourceFinder;
pub use path::{PathCategory, PathSet, PropagationPath};
pub use sampler::{DirectionSampler, fibonacci_directions};
pub use simulator::AcousticSimulator;
pub use surfaces::{DuplicateHitFilter, probe_surfaces};
