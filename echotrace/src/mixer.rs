// Mixer module - sums the playing dry clips into the mono dry signal

use crate::events::EchoTraceEvent;
use crate::playback::PlaybackInstance;

/// Summary of one mix call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MixResult {
    /// Largest number of frames any clip contributed
    pub frames_filled: usize,
    /// Clips that were playing when the call started
    pub active_sources: usize,
}

/// Overwrites `dry` with the sum of every playing clip.
///
/// Clips that finish (`LoopMode::Once`) or wrap (`LoopMode::Infinite`) during
/// this call are reported through `on_event`. Nothing here allocates.
pub fn mix_dry_signal(
    dry: &mut [f32],
    instances: &mut [PlaybackInstance],
    on_event: &mut impl FnMut(EchoTraceEvent),
) -> MixResult {
    dry.fill(0.0);
    let mut result = MixResult::default();

    for instance in instances.iter_mut() {
        if !instance.info.is_playing() {
            continue;
        }
        result.active_sources += 1;

        let outcome = instance.mix_into(dry);
        result.frames_filled = result.frames_filled.max(outcome.frames_mixed);

        if outcome.loops > 0 {
            on_event(EchoTraceEvent::SourceLooped {
                source_id: instance.source_id,
                loop_count: instance.info.loop_count,
            });
        }
        if outcome.completed {
            on_event(EchoTraceEvent::SourceCompleted {
                source_id: instance.source_id,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::EchoTraceAudioData;
    use crate::playback::LoopMode;
    use crate::world::SourceId;
    use std::sync::Arc;

    fn clip(id: u64, samples: Vec<f32>) -> PlaybackInstance {
        PlaybackInstance::new(
            SourceId::new(id),
            Arc::new(EchoTraceAudioData::from_mono(samples, 48000)),
        )
    }

    #[test]
    fn test_sums_playing_clips() {
        let mut instances = vec![clip(1, vec![0.25; 8]), clip(2, vec![0.5; 8]), clip(3, vec![1.0; 8])];
        instances[0].play(LoopMode::Once);
        instances[1].play(LoopMode::Once);

        let mut dry = [9.0; 4];
        let mut events = Vec::new();
        let result = mix_dry_signal(&mut dry, &mut instances, &mut |e| events.push(e));

        assert_eq!(dry, [0.75; 4]);
        assert_eq!(result.active_sources, 2);
        assert_eq!(result.frames_filled, 4);
        assert!(events.is_empty());
    }

    #[test]
    fn test_reports_completion_and_loops() {
        let mut instances = vec![clip(1, vec![1.0; 3]), clip(2, vec![1.0; 3])];
        instances[0].play(LoopMode::Once);
        instances[1].play(LoopMode::Infinite);

        let mut dry = [0.0; 4];
        let mut events = Vec::new();
        mix_dry_signal(&mut dry, &mut instances, &mut |e| events.push(e));

        assert_eq!(
            events,
            vec![
                EchoTraceEvent::SourceCompleted {
                    source_id: SourceId::new(1)
                },
                EchoTraceEvent::SourceLooped {
                    source_id: SourceId::new(2),
                    loop_count: 1
                },
            ]
        );
        assert_eq!(dry, [2.0, 2.0, 2.0, 1.0]);
    }
}
