//! Real-time side of the world.
//!
//! [`RenderContext`] owns everything the audio callback touches: the
//! binaural renderer, the snapshot subscriber and the dry clips. All of it is
//! allocated up front, so [`RenderContext::fill_buffer`] neither allocates nor
//! blocks. Clips replaced or unregistered here are sent back to the world,
//! which frees them off the audio thread.

use crate::config::EchoTraceWorldDesc;
use crate::events::EchoTraceEvent;
use crate::mixer::mix_dry_signal;
use crate::playback::{PlaybackCommand, PlaybackInstance};
use crate::snapshot::SnapshotSubscriber;
use crate::spatial::{BinauralRenderer, RenderParams};
use crate::world::SourceId;
use crossbeam_channel::{Receiver, Sender};

pub struct RenderContext {
    renderer: BinauralRenderer,
    subscriber: SnapshotSubscriber,
    commands: Receiver<PlaybackCommand>,
    events: Sender<EchoTraceEvent>,
    retired: Sender<PlaybackInstance>,
    instances: Vec<PlaybackInstance>,
    max_sources: usize,
    /// Mono dry signal for one chunk of the host block
    dry: Vec<f32>,
    frames_rendered: u64,
}

impl RenderContext {
    pub(crate) fn new(
        desc: &EchoTraceWorldDesc,
        subscriber: SnapshotSubscriber,
        commands: Receiver<PlaybackCommand>,
        events: Sender<EchoTraceEvent>,
        retired: Sender<PlaybackInstance>,
    ) -> Self {
        let renderer = BinauralRenderer::new(
            desc.sample_rate,
            desc.delay_buffer_len(),
            desc.max_paths,
            RenderParams::from_config(&desc.acoustics),
        );
        Self {
            renderer,
            subscriber,
            commands,
            events,
            retired,
            instances: Vec::with_capacity(desc.max_sources),
            max_sources: desc.max_sources,
            dry: vec![0.0; desc.block_size.max(1)],
            frames_rendered: 0,
        }
    }

    /// Audio callback body: fills the interleaved `output` completely.
    ///
    /// Applies pending playback commands, adopts the newest path snapshot,
    /// mixes the dry clips and renders them through every path. Host blocks
    /// larger than the configured block size are rendered in pieces. Returns
    /// the number of frames written.
    pub fn fill_buffer(&mut self, output: &mut [f32], channels: u16) -> usize {
        self.apply_commands();
        self.adopt_snapshot();

        let channels = channels as usize;
        if channels == 0 {
            output.fill(0.0);
            return 0;
        }

        let frames = output.len() / channels;
        output[frames * channels..].fill(0.0);

        let chunk_frames = self.dry.len();
        for block in output[..frames * channels].chunks_mut(chunk_frames * channels) {
            let block_frames = block.len() / channels;
            let dry = &mut self.dry[..block_frames];
            let events = &self.events;
            let mix = mix_dry_signal(dry, &mut self.instances, &mut |event| emit(events, event));
            if mix.active_sources == 0 {
                // Nothing playing: only let the delay line ring out
                self.renderer.process_silence(block, channels);
            } else {
                self.renderer.process(dry, block, channels);
            }
        }

        self.frames_rendered += frames as u64;
        frames
    }

    /// Passes the dry signal through unspatialized.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.renderer.set_bypass(bypass);
    }

    pub fn is_bypassed(&self) -> bool {
        self.renderer.is_bypassed()
    }

    /// Version of the snapshot currently rendered, 0 before the first one.
    pub fn active_version(&self) -> u64 {
        self.subscriber.current_version()
    }

    pub fn active_paths(&self) -> usize {
        self.renderer.active_paths()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    pub(crate) fn event_sender(&self) -> Sender<EchoTraceEvent> {
        self.events.clone()
    }

    fn retire(&self, instance: PlaybackInstance) {
        // A full channel means the world stopped draining; drop here then
        let _ = self.retired.try_send(instance);
    }

    fn instance_mut(&mut self, source_id: SourceId) -> Option<&mut PlaybackInstance> {
        self.instances
            .iter_mut()
            .find(|instance| instance.source_id == source_id)
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                PlaybackCommand::Register(source_id, audio_data) => {
                    let incoming = PlaybackInstance::new(source_id, audio_data);
                    if let Some(instance) = self.instance_mut(source_id) {
                        let replaced = std::mem::replace(instance, incoming);
                        self.retire(replaced);
                    } else if self.instances.len() < self.max_sources {
                        self.instances.push(incoming);
                    } else {
                        emit(&self.events, EchoTraceEvent::SourceRejected { source_id });
                        self.retire(incoming);
                    }
                }
                PlaybackCommand::Unregister(source_id) => {
                    if let Some(index) = self
                        .instances
                        .iter()
                        .position(|instance| instance.source_id == source_id)
                    {
                        let removed = self.instances.swap_remove(index);
                        self.retire(removed);
                    }
                }
                PlaybackCommand::Play(source_id, loop_mode) => {
                    if let Some(instance) = self.instance_mut(source_id) {
                        instance.play(loop_mode);
                        emit(&self.events, EchoTraceEvent::SourceStarted { source_id });
                    } else {
                        emit(&self.events, EchoTraceEvent::UnknownSource { source_id });
                    }
                }
                PlaybackCommand::Pause(source_id) => {
                    if let Some(instance) = self.instance_mut(source_id) {
                        instance.pause();
                    } else {
                        emit(&self.events, EchoTraceEvent::UnknownSource { source_id });
                    }
                }
                PlaybackCommand::Stop(source_id) => {
                    if let Some(instance) = self.instance_mut(source_id) {
                        instance.stop();
                        emit(&self.events, EchoTraceEvent::SourceStopped { source_id });
                    } else {
                        emit(&self.events, EchoTraceEvent::UnknownSource { source_id });
                    }
                }
                PlaybackCommand::StopAll => {
                    for instance in self.instances.iter_mut() {
                        if instance.info.is_playing() {
                            instance.stop();
                            emit(
                                &self.events,
                                EchoTraceEvent::SourceStopped {
                                    source_id: instance.source_id,
                                },
                            );
                        }
                    }
                }
                PlaybackCommand::SetBypass(bypass) => self.renderer.set_bypass(bypass),
            }
        }
    }

    fn adopt_snapshot(&mut self) {
        let Some(snapshot) = self.subscriber.poll() else {
            return;
        };
        self.renderer.set_params(snapshot.params);
        let dropped = self.renderer.set_paths(&snapshot.paths, &snapshot.listener);

        let version = snapshot.version;
        emit(
            &self.events,
            EchoTraceEvent::SnapshotAdopted {
                version,
                paths: self.renderer.active_paths(),
            },
        );
        if dropped > 0 {
            emit(&self.events, EchoTraceEvent::PathsTruncated { version, dropped });
        }
    }
}

/// Reports an event without blocking; a full channel drops it.
fn emit(events: &Sender<EchoTraceEvent>, event: EchoTraceEvent) {
    let _ = events.try_send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::{PathSet, PropagationPath};
    use crate::audio_data::EchoTraceAudioData;
    use crate::math::{Pose, Vec3};
    use crate::playback::LoopMode;
    use crate::snapshot::snapshot_channel;
    use crossbeam_channel::{bounded, unbounded};
    use std::sync::Arc;

    struct Harness {
        context: RenderContext,
        publisher: crate::snapshot::SnapshotPublisher,
        commands: Sender<PlaybackCommand>,
        events: Receiver<EchoTraceEvent>,
        retired: Receiver<PlaybackInstance>,
    }

    fn harness(desc: EchoTraceWorldDesc) -> Harness {
        let (publisher, subscriber) = snapshot_channel(4);
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = bounded(64);
        let (retired_tx, retired_rx) = bounded(8);
        Harness {
            context: RenderContext::new(&desc, subscriber, command_rx, event_tx, retired_tx),
            publisher,
            commands: command_tx,
            events: event_rx,
            retired: retired_rx,
        }
    }

    fn small_desc() -> EchoTraceWorldDesc {
        EchoTraceWorldDesc {
            block_size: 64,
            max_sources: 2,
            ..Default::default()
        }
    }

    fn impulse_clip() -> Arc<EchoTraceAudioData> {
        let mut samples = vec![0.0; 4096];
        samples[0] = 1.0;
        Arc::new(EchoTraceAudioData::from_mono(samples, 48000))
    }

    #[test]
    fn test_silence_without_snapshot() {
        let mut h = harness(small_desc());
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(1), impulse_clip()))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Play(SourceId::new(1), LoopMode::Once))
            .unwrap();

        let mut output = vec![1.0; 512];
        assert_eq!(h.context.fill_buffer(&mut output, 2), 256);
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(h.context.active_version(), 0);
    }

    #[test]
    fn test_renders_direct_path_across_blocks() {
        let mut h = harness(small_desc());
        let source = Vec3::ZERO;
        let listener = Pose::from_position(Vec3::new(2.0, 0.0, 0.0));
        let paths = PathSet {
            direct: PropagationPath::new(source, 0.0, 1.0),
            ..PathSet::empty()
        };
        h.publisher
            .publish(paths, listener, RenderParams::default());
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(7), impulse_clip()))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Play(SourceId::new(7), LoopMode::Once))
            .unwrap();

        // One host block much larger than the 64-frame scratch buffer
        let mut output = vec![0.0; 1024 * 2];
        h.context.fill_buffer(&mut output, 2);

        assert_eq!(h.context.active_version(), 1);
        assert_eq!(h.context.active_paths(), 1);
        // Left ear is 1.9 m away, right ear 2.1 m
        let left_index = (1.9_f32 * 48000.0 / 343.0).round() as usize;
        let right_index = (2.1_f32 * 48000.0 / 343.0).round() as usize;
        assert!(output[left_index * 2] > 0.0);
        assert!(output[right_index * 2 + 1] > 0.0);
        assert!(output[left_index * 2] > output[right_index * 2 + 1]);

        let events: Vec<EchoTraceEvent> = h.events.try_iter().collect();
        assert!(events.contains(&EchoTraceEvent::SourceStarted {
            source_id: SourceId::new(7)
        }));
        assert!(events.contains(&EchoTraceEvent::SnapshotAdopted {
            version: 1,
            paths: 1
        }));
    }

    #[test]
    fn test_rejects_sources_over_capacity() {
        let mut h = harness(small_desc());
        for id in 1..=3 {
            h.commands
                .send(PlaybackCommand::Register(SourceId::new(id), impulse_clip()))
                .unwrap();
        }
        let mut output = vec![0.0; 128];
        h.context.fill_buffer(&mut output, 2);
        let events: Vec<EchoTraceEvent> = h.events.try_iter().collect();
        assert_eq!(
            events,
            vec![EchoTraceEvent::SourceRejected {
                source_id: SourceId::new(3)
            }]
        );
    }

    #[test]
    fn test_bypass_passes_dry_through() {
        let mut h = harness(small_desc());
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(1), impulse_clip()))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Play(SourceId::new(1), LoopMode::Once))
            .unwrap();
        h.context.set_bypass(true);

        let mut output = vec![0.0; 8];
        h.context.fill_buffer(&mut output, 2);
        assert_eq!(&output[..4], &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_source_reported() {
        let mut h = harness(small_desc());
        h.commands
            .send(PlaybackCommand::Play(SourceId::new(42), LoopMode::Once))
            .unwrap();
        let mut output = vec![0.0; 16];
        h.context.fill_buffer(&mut output, 2);
        assert_eq!(
            h.events.try_recv().ok(),
            Some(EchoTraceEvent::UnknownSource {
                source_id: SourceId::new(42)
            })
        );
    }

    #[test]
    fn test_removed_clips_sent_back() {
        let mut h = harness(small_desc());
        let first = impulse_clip();
        let second = impulse_clip();
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(1), first.clone()))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(1), second.clone()))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Unregister(SourceId::new(1)))
            .unwrap();

        let mut output = vec![0.0; 16];
        h.context.fill_buffer(&mut output, 2);

        let retired: Vec<PlaybackInstance> = h.retired.try_iter().collect();
        assert_eq!(retired.len(), 2);
        assert!(Arc::ptr_eq(&retired[0].audio_data, &first));
        assert!(Arc::ptr_eq(&retired[1].audio_data, &second));
    }

    #[test]
    fn test_delay_line_rings_out_after_clip_ends() {
        let mut h = harness(small_desc());
        let listener = Pose::from_position(Vec3::new(2.0, 0.0, 0.0));
        let paths = PathSet {
            direct: PropagationPath::new(Vec3::ZERO, 0.0, 1.0),
            ..PathSet::empty()
        };
        h.publisher.publish(paths, listener, RenderParams::default());

        // Clip ends inside the first 64-frame chunk, the arrival lands later
        let mut samples = vec![0.0; 16];
        samples[0] = 1.0;
        let clip = Arc::new(EchoTraceAudioData::from_mono(samples, 48000));
        h.commands
            .send(PlaybackCommand::Register(SourceId::new(3), clip))
            .unwrap();
        h.commands
            .send(PlaybackCommand::Play(SourceId::new(3), LoopMode::Once))
            .unwrap();

        let mut output = vec![0.0; 512 * 2];
        h.context.fill_buffer(&mut output, 2);

        let left_index = (1.9_f32 * 48000.0 / 343.0).round() as usize;
        assert!(left_index > 64);
        assert!(output[left_index * 2] > 0.0);
        assert!(h.events.try_iter().any(|e| e
            == EchoTraceEvent::SourceCompleted {
                source_id: SourceId::new(3)
            }));
    }
}
