use crate::acoustics::{AcousticSimulator, PathCategory, PathSet};
use crate::audio_data::EchoTraceAudioData;
use crate::config::{AcousticConfig, EchoTraceWorldDesc};
use crate::error::{EchoTraceError, Result};
use crate::events::EchoTraceEvent;
use crate::math::{Pose, Vec3};
use crate::playback::{LoopMode, PlaybackCommand, PlaybackInstance};
use crate::render::RenderContext;
use crate::scene::CollisionOracle;
use crate::snapshot::{DEFAULT_SNAPSHOT_CAPACITY, SnapshotPublisher, snapshot_channel};
use crate::spatial::{ImpulseResponse, RenderParams};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capacity of the render-to-main event channel. Events beyond it are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle of a dry clip registered with a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Outcome of one simulation tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Version of the snapshot published by this tick
    pub version: u64,
    pub direct: bool,
    pub primary: usize,
    pub secondary: usize,
    pub higher_order: usize,
    /// Wall time spent in the path search
    pub elapsed: Duration,
}

impl TickReport {
    fn new(version: u64, paths: &PathSet, elapsed: Duration) -> Self {
        Self {
            version,
            direct: paths.direct.valid,
            primary: paths.count(PathCategory::Primary),
            secondary: paths.count(PathCategory::Secondary),
            higher_order: paths.count(PathCategory::HigherOrder),
            elapsed,
        }
    }

    /// Valid paths across all categories
    pub fn total_paths(&self) -> usize {
        usize::from(self.direct) + self.primary + self.secondary + self.higher_order
    }
}

/// Main-thread API of EchoTrace.
///
/// `EchoTraceWorld` holds the scene oracle, the source position and the
/// listener pose, and runs the path search on [`tick`](Self::tick). Every tick
/// publishes an immutable snapshot for the render thread.
///
/// # Architecture
///
/// - **Main thread**: owns the world, loads clips, moves source and listener,
///   calls `tick` at its own pace
/// - **Audio thread**: owns the [`RenderContext`] taken with
///   [`take_render_endpoint`](Self::take_render_endpoint), receives snapshots
///   and playback commands without locks
pub struct EchoTraceWorld {
    desc: EchoTraceWorldDesc,
    simulator: AcousticSimulator,
    oracle: Option<Arc<dyn CollisionOracle>>,
    source_position: Vec3,
    listener: Pose,
    publisher: SnapshotPublisher,
    render_endpoint: Option<RenderContext>,
    audio_data_storage: HashMap<SourceId, Arc<EchoTraceAudioData>>,
    next_source_id: u64,
    command_sender: Sender<PlaybackCommand>,
    event_receiver: Receiver<EchoTraceEvent>,
    /// Clips the render thread let go of, freed here
    retired_receiver: Receiver<PlaybackInstance>,
}

impl EchoTraceWorld {
    pub fn new(desc: EchoTraceWorldDesc) -> Result<Self> {
        desc.validate()?;
        let simulator = AcousticSimulator::new(desc.acoustics.clone())?;

        let (publisher, subscriber) = snapshot_channel(DEFAULT_SNAPSHOT_CAPACITY);
        let (command_sender, command_receiver) = unbounded();
        let (event_sender, event_receiver) = bounded(EVENT_CHANNEL_CAPACITY);
        let (retired_sender, retired_receiver) = bounded(desc.max_sources.max(1) * 2);
        let render_endpoint = RenderContext::new(
            &desc,
            subscriber,
            command_receiver,
            event_sender,
            retired_sender,
        );

        log::info!(
            "Created world: {} Hz, {} directions, {} bounces",
            desc.sample_rate,
            desc.acoustics.sample_resolution,
            desc.acoustics.bounce_count
        );

        Ok(Self {
            desc,
            simulator,
            oracle: None,
            source_position: Vec3::ZERO,
            listener: Pose::default(),
            publisher,
            render_endpoint: Some(render_endpoint),
            audio_data_storage: HashMap::new(),
            next_source_id: 1,
            command_sender,
            event_receiver,
            retired_receiver,
        })
    }

    pub fn desc(&self) -> &EchoTraceWorldDesc {
        &self.desc
    }

    pub fn sample_rate(&self) -> u32 {
        self.desc.sample_rate
    }

    pub fn set_collision_oracle(&mut self, oracle: Arc<dyn CollisionOracle>) {
        self.oracle = Some(oracle);
    }

    pub fn set_source_position(&mut self, position: Vec3) {
        self.source_position = position;
    }

    pub fn source_position(&self) -> Vec3 {
        self.source_position
    }

    pub fn set_listener_pose(&mut self, pose: Pose) {
        self.listener = pose;
    }

    pub fn listener_pose(&self) -> Pose {
        self.listener
    }

    pub fn acoustic_config(&self) -> &AcousticConfig {
        self.simulator.config()
    }

    /// Replaces the simulation and rendering parameters. The renderer picks
    /// them up with the next published snapshot.
    pub fn set_acoustic_config(&mut self, config: AcousticConfig) -> Result<()> {
        self.simulator.set_config(config.clone())?;
        self.desc.acoustics = config;
        Ok(())
    }

    /// Runs one path search with the current positions and publishes the
    /// result to the render thread.
    ///
    /// # Errors
    ///
    /// Returns `Simulation` if no collision oracle has been set.
    pub fn tick(&mut self) -> Result<TickReport> {
        let oracle = self
            .oracle
            .as_ref()
            .ok_or_else(|| EchoTraceError::Simulation("No collision oracle set".to_string()))?;

        let started = Instant::now();
        let paths = self
            .simulator
            .tick(oracle.as_ref(), self.source_position, self.listener.position);
        let elapsed = started.elapsed();

        let report_paths = TickReport::new(0, &paths, elapsed);
        let params = RenderParams::from_config(self.simulator.config());
        let version = self.publisher.publish(paths, self.listener, params);
        self.collect_garbage();
        let report = TickReport {
            version,
            ..report_paths
        };

        log::debug!(
            "Tick {}: {} paths in {:?}",
            report.version,
            report.total_paths(),
            report.elapsed
        );
        Ok(report)
    }

    /// Path set of the latest tick, `None` before the first.
    pub fn path_set(&self) -> Option<&PathSet> {
        self.publisher.latest().map(|snapshot| &snapshot.paths)
    }

    /// Static impulse response of the latest tick.
    pub fn impulse_response(&self) -> Option<ImpulseResponse> {
        self.publisher.latest().map(|snapshot| {
            ImpulseResponse::from_paths(
                &snapshot.paths,
                &snapshot.listener,
                self.desc.sample_rate,
                &snapshot.params,
            )
        })
    }

    /// Hands out the render side. Only the first call returns `Some`.
    pub fn take_render_endpoint(&mut self) -> Option<RenderContext> {
        self.render_endpoint.take()
    }

    /// Registers a dry clip, resampling it to the world rate if needed.
    pub fn register_audio(&mut self, audio_data: Arc<EchoTraceAudioData>) -> Result<SourceId> {
        if self.audio_data_storage.len() >= self.desc.max_sources {
            return Err(EchoTraceError::Engine(format!(
                "Source limit of {} reached",
                self.desc.max_sources
            )));
        }

        let audio_data = if audio_data.sample_rate() != self.desc.sample_rate {
            Arc::new(audio_data.resample(self.desc.sample_rate)?)
        } else {
            audio_data
        };

        self.collect_garbage();
        let source_id = SourceId::new(self.next_source_id);
        self.next_source_id += 1;
        self.send(PlaybackCommand::Register(source_id, audio_data.clone()))?;
        self.audio_data_storage.insert(source_id, audio_data);
        log::info!("Registered {}", source_id);
        Ok(source_id)
    }

    pub fn unregister_audio(&mut self, source_id: SourceId) -> Result<Option<Arc<EchoTraceAudioData>>> {
        let removed = self.audio_data_storage.remove(&source_id);
        if removed.is_some() {
            self.send(PlaybackCommand::Unregister(source_id))?;
        }
        Ok(removed)
    }

    pub fn audio_data(&self, source_id: SourceId) -> Option<&Arc<EchoTraceAudioData>> {
        self.audio_data_storage.get(&source_id)
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.audio_data_storage.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Starts or resumes a registered clip.
    pub fn play(&self, source_id: SourceId, loop_mode: LoopMode) -> Result<()> {
        if !self.audio_data_storage.contains_key(&source_id) {
            return Err(EchoTraceError::Engine(format!(
                "Audio data {} not found",
                source_id
            )));
        }
        self.send(PlaybackCommand::Play(source_id, loop_mode))
    }

    /// Pauses a clip, keeping its position.
    pub fn pause(&self, source_id: SourceId) -> Result<()> {
        self.send(PlaybackCommand::Pause(source_id))
    }

    /// Stops a clip and rewinds it.
    pub fn stop(&self, source_id: SourceId) -> Result<()> {
        self.send(PlaybackCommand::Stop(source_id))
    }

    pub fn stop_all(&self) -> Result<()> {
        self.send(PlaybackCommand::StopAll)
    }

    /// Switches the renderer between spatialized output and the plain dry signal.
    pub fn set_bypass(&self, bypass: bool) -> Result<()> {
        self.send(PlaybackCommand::SetBypass(bypass))
    }

    /// Drains the events reported by the render thread so far.
    pub fn poll_events(&self) -> Vec<EchoTraceEvent> {
        self.collect_garbage();
        self.event_receiver.try_iter().collect()
    }

    /// Frees the clips the render thread has replaced or unregistered.
    /// Runs on every tick and event poll; returns how many were freed.
    pub fn collect_garbage(&self) -> usize {
        self.retired_receiver.try_iter().count()
    }

    fn send(&self, command: PlaybackCommand) -> Result<()> {
        self.command_sender
            .send(command)
            .map_err(|e| EchoTraceError::Engine(format!("Failed to send command: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AnalyticScene, Surface};

    fn floor_world() -> EchoTraceWorld {
        let desc = EchoTraceWorldDesc {
            block_size: 256,
            acoustics: AcousticConfig::default().bounce_count(1),
            ..Default::default()
        };
        let mut world = EchoTraceWorld::new(desc).unwrap();
        world.set_collision_oracle(Arc::new(
            AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y)),
        ));
        world.set_source_position(Vec3::new(0.0, 2.0, 0.0));
        world.set_listener_pose(Pose::from_position(Vec3::new(5.0, 2.0, 0.0)));
        world
    }

    #[test]
    fn test_tick_requires_oracle() {
        let mut world = EchoTraceWorld::new(EchoTraceWorldDesc::default()).unwrap();
        assert!(matches!(world.tick(), Err(EchoTraceError::Simulation(_))));
        assert!(world.path_set().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let desc = EchoTraceWorldDesc {
            acoustics: AcousticConfig::default().sample_resolution(1),
            ..Default::default()
        };
        assert!(matches!(
            EchoTraceWorld::new(desc),
            Err(EchoTraceError::Configuration(_))
        ));
    }

    #[test]
    fn test_tick_publishes_versions() {
        let mut world = floor_world();
        let first = world.tick().unwrap();
        let second = world.tick().unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert!(first.direct);
        assert_eq!(first.primary, 1);
        assert_eq!(world.path_set().map(|p| p.primary.len()), Some(1));

        let ir = world.impulse_response().unwrap();
        assert!(ir.energy() > 0.0);
    }

    #[test]
    fn test_render_endpoint_receives_ticks() {
        let mut world = floor_world();
        let mut context = world.take_render_endpoint().unwrap();
        assert!(world.take_render_endpoint().is_none());

        let clip = Arc::new(EchoTraceAudioData::from_mono(vec![0.5; 48000], 48000));
        let id = world.register_audio(clip).unwrap();
        world.play(id, LoopMode::Infinite).unwrap();
        world.tick().unwrap();

        let mut output = vec![0.0; 4096];
        context.fill_buffer(&mut output, 2);
        assert_eq!(context.active_version(), 1);
        assert!(context.active_paths() >= 2);

        let events = world.poll_events();
        assert!(events.contains(&EchoTraceEvent::SourceStarted { source_id: id }));
    }

    #[test]
    fn test_register_resamples_and_play_checks_id() {
        let mut world = floor_world();
        let clip = Arc::new(EchoTraceAudioData::from_mono(vec![0.0; 4410], 44100));
        let id = world.register_audio(clip).unwrap();
        assert_eq!(world.audio_data(id).map(|c| c.sample_rate()), Some(48000));
        assert!(world.play(SourceId::new(999), LoopMode::Once).is_err());
        assert!(world.unregister_audio(id).unwrap().is_some());
        assert!(world.source_ids().is_empty());
    }

    #[test]
    fn test_unregistered_clip_freed_by_world() {
        let mut world = floor_world();
        let mut context = world.take_render_endpoint().unwrap();
        let clip = Arc::new(EchoTraceAudioData::from_mono(vec![0.25; 1024], 48000));
        let id = world.register_audio(clip.clone()).unwrap();

        let mut output = vec![0.0; 64];
        context.fill_buffer(&mut output, 2);
        assert!(world.unregister_audio(id).unwrap().is_some());
        context.fill_buffer(&mut output, 2);

        // The render thread handed its clone back instead of dropping it
        assert_eq!(Arc::strong_count(&clip), 2);
        assert_eq!(world.collect_garbage(), 1);
        assert_eq!(Arc::strong_count(&clip), 1);
    }
}
