//! EchoTrace: geometric-acoustics path finding and real-time binaural rendering.
//!
//! A simulation tick casts batched rays through a [`CollisionOracle`] to find
//! the direct path, first- and second-order image-source reflections and
//! multi-bounce paths between one source and the listener. The resulting
//! [`PathSet`] is published as an immutable snapshot to the render thread,
//! which scatters the dry signal through every path into a stereo delay line.
//!
//! ```no_run
//! use echotrace::math::{Pose, Vec3};
//! use echotrace::scene::AnalyticScene;
//! use echotrace::{EchoTraceWorld, EchoTraceWorldDesc};
//! use std::sync::Arc;
//!
//! let mut world = EchoTraceWorld::new(EchoTraceWorldDesc::default())?;
//! world.set_collision_oracle(Arc::new(AnalyticScene::shoebox(
//!     Vec3::ZERO,
//!     Vec3::new(8.0, 3.0, 6.0),
//! )));
//! world.set_source_position(Vec3::new(2.0, 1.5, 3.0));
//! world.set_listener_pose(Pose::from_position(Vec3::new(6.0, 1.5, 3.0)));
//! let report = world.tick()?;
//! println!("{} paths", report.total_paths());
//! # Ok::<(), echotrace::EchoTraceError>(())
//! ```

pub mod acoustics;
pub mod audio_data;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod mixer;
pub mod playback;
pub mod render;
pub mod scene;
pub mod snapshot;
pub mod spatial;
pub mod world;

pub use acoustics::{AcousticSimulator, PathCategory, PathSet, PropagationPath};
pub use audio_data::{EchoTraceAudioData, load_impulse_response_wav};
pub use config::{AcousticConfig, EchoTraceWorldDesc};
pub use engine::{AudioFillCallback, EchoTraceEngine};
pub use error::{EchoTraceError, Result};
pub use events::EchoTraceEvent;
pub use playback::{LoopMode, PlayState, PlaybackCommand, PlaybackInfo, PlaybackInstance};
pub use render::RenderContext;
pub use scene::{AnalyticScene, CollisionOracle, RayHit, RayQuery};
pub use snapshot::RenderSnapshot;
pub use spatial::{BinauralRenderer, ImpulseResponse};
pub use world::{EchoTraceWorld, SourceId, TickReport};
