use crate::audio_data::EchoTraceAudioData;
use crate::world::SourceId;
use std::sync::Arc;

/// What happens when a clip reaches its end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once, then stop
    #[default]
    Once,
    /// Wrap to the start and keep playing
    Infinite,
}

/// Playback state of a dry clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
}

/// Position and state of a dry clip
#[derive(Debug, Clone)]
pub struct PlaybackInfo {
    /// Current playback position in frames
    pub current_frame: usize,
    pub total_frames: usize,
    pub play_state: PlayState,
    pub loop_mode: LoopMode,
    /// Completed passes through the clip in `LoopMode::Infinite`
    pub loop_count: u32,
}

impl PlaybackInfo {
    pub fn new(total_frames: usize) -> Self {
        Self {
            current_frame: 0,
            total_frames,
            play_state: PlayState::Stopped,
            loop_mode: LoopMode::Once,
            loop_count: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    pub fn current_time(&self, sample_rate: u32) -> f64 {
        self.current_frame as f64 / sample_rate.max(1) as f64
    }
}

/// What a clip did during one mix call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MixOutcome {
    pub frames_mixed: usize,
    /// Clip ran out in `LoopMode::Once` and stopped
    pub completed: bool,
    /// Clip wrapped this many times in `LoopMode::Infinite`
    pub loops: u32,
}

/// A registered dry clip as seen by the render thread
#[derive(Debug)]
pub struct PlaybackInstance {
    pub source_id: SourceId,
    pub audio_data: Arc<EchoTraceAudioData>,
    pub info: PlaybackInfo,
}

impl PlaybackInstance {
    pub fn new(source_id: SourceId, audio_data: Arc<EchoTraceAudioData>) -> Self {
        let info = PlaybackInfo::new(audio_data.len());
        Self {
            source_id,
            audio_data,
            info,
        }
    }

    /// Starts or resumes playback. A stopped clip restarts from the beginning.
    pub fn play(&mut self, loop_mode: LoopMode) {
        if self.info.play_state == PlayState::Stopped {
            self.info.current_frame = 0;
            self.info.loop_count = 0;
        }
        self.info.loop_mode = loop_mode;
        self.info.play_state = PlayState::Playing;
    }

    pub fn pause(&mut self) {
        if self.info.play_state == PlayState::Playing {
            self.info.play_state = PlayState::Paused;
        }
    }

    /// Stops and rewinds.
    pub fn stop(&mut self) {
        self.info.play_state = PlayState::Stopped;
        self.info.current_frame = 0;
    }

    /// Adds the next `dry.len()` samples of the clip into `dry`.
    pub fn mix_into(&mut self, dry: &mut [f32]) -> MixOutcome {
        let mut outcome = MixOutcome::default();
        if !self.info.is_playing() {
            return outcome;
        }
        let samples = self.audio_data.samples();
        if samples.is_empty() {
            self.stop();
            outcome.completed = true;
            return outcome;
        }

        let mut written = 0;
        while written < dry.len() {
            let available = samples.len() - self.info.current_frame;
            let count = available.min(dry.len() - written);
            let source = &samples[self.info.current_frame..self.info.current_frame + count];
            for (out, sample) in dry[written..written + count].iter_mut().zip(source) {
                *out += sample;
            }
            written += count;
            self.info.current_frame += count;

            if self.info.current_frame >= samples.len() {
                match self.info.loop_mode {
                    LoopMode::Once => {
                        self.stop();
                        outcome.completed = true;
                        break;
                    }
                    LoopMode::Infinite => {
                        self.info.current_frame = 0;
                        self.info.loop_count += 1;
                        outcome.loops += 1;
                    }
                }
            }
        }

        outcome.frames_mixed = written;
        outcome
    }
}

/// Commands sent from the world to the render thread
#[derive(Debug)]
pub enum PlaybackCommand {
    Register(SourceId, Arc<EchoTraceAudioData>),
    Unregister(SourceId),
    Play(SourceId, LoopMode),
    Pause(SourceId),
    Stop(SourceId),
    StopAll,
    SetBypass(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(samples: Vec<f32>) -> PlaybackInstance {
        PlaybackInstance::new(
            SourceId::new(1),
            Arc::new(EchoTraceAudioData::from_mono(samples, 48000)),
        )
    }

    #[test]
    fn test_stopped_clip_is_silent() {
        let mut clip = instance(vec![1.0; 8]);
        let mut dry = [0.0; 4];
        assert_eq!(clip.mix_into(&mut dry).frames_mixed, 0);
        assert_eq!(dry, [0.0; 4]);
    }

    #[test]
    fn test_once_completes() {
        let mut clip = instance(vec![0.5, 0.25, 0.125]);
        clip.play(LoopMode::Once);
        let mut dry = [1.0; 5];
        let outcome = clip.mix_into(&mut dry);
        assert!(outcome.completed);
        assert_eq!(outcome.frames_mixed, 3);
        assert_eq!(dry, [1.5, 1.25, 1.125, 1.0, 1.0]);
        assert_eq!(clip.info.play_state, PlayState::Stopped);
        assert_eq!(clip.info.current_frame, 0);
    }

    #[test]
    fn test_infinite_wraps() {
        let mut clip = instance(vec![1.0, 2.0]);
        clip.play(LoopMode::Infinite);
        let mut dry = [0.0; 5];
        let outcome = clip.mix_into(&mut dry);
        assert_eq!(dry, [1.0, 2.0, 1.0, 2.0, 1.0]);
        assert_eq!(outcome.loops, 2);
        assert!(!outcome.completed);
        assert_eq!(clip.info.loop_count, 2);
        assert_eq!(clip.info.current_frame, 1);
    }

    #[test]
    fn test_pause_resumes_in_place() {
        let mut clip = instance(vec![1.0, 2.0, 3.0, 4.0]);
        clip.play(LoopMode::Once);
        let mut dry = [0.0; 2];
        clip.mix_into(&mut dry);
        clip.pause();
        let mut silent = [0.0; 2];
        clip.mix_into(&mut silent);
        assert_eq!(silent, [0.0; 2]);

        clip.play(LoopMode::Once);
        let mut rest = [0.0; 2];
        clip.mix_into(&mut rest);
        assert_eq!(rest, [3.0, 4.0]);
    }
}
