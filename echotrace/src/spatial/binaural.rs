use crate::acoustics::{PathSet, PropagationPath};
use crate::config::AcousticConfig;
use crate::math::{Pose, Vec3};
use crate::spatial::{DcBlocker, DelayBuffer};

/// Average path lengths below this are clamped before computing attenuation.
pub const MIN_AVERAGE_DISTANCE: f32 = 0.1;

/// Interaural level factor in [-1, 1]. Positive when the path reaches the
/// right ear first.
pub fn level_factor(left_distance: f32, right_distance: f32, ear_distance: f32, divisor: f32) -> f32 {
    let denominator = divisor * ear_distance;
    if !(denominator > 0.0) {
        return 0.0;
    }
    ((left_distance - right_distance) / denominator).clamp(-1.0, 1.0)
}

/// Inverse-distance amplitude, `2 / d`.
pub fn distance_attenuation(average_distance: f32) -> f32 {
    2.0 / average_distance.max(MIN_AVERAGE_DISTANCE)
}

/// Renderer parameters that may change while the stream runs.
///
/// They travel with every snapshot so the render thread picks up changes
/// without a separate channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub gain: f32,
    pub delay_smoothing: f32,
    pub ear_separation: f32,
    pub level_divisor: f32,
    pub speed_of_sound: f32,
    pub dc_block: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::from_config(&AcousticConfig::default())
    }
}

impl RenderParams {
    pub fn from_config(config: &AcousticConfig) -> Self {
        Self {
            gain: config.gain,
            delay_smoothing: config.delay_smoothing,
            ear_separation: config.ear_separation,
            level_divisor: config.level_divisor,
            speed_of_sound: config.speed_of_sound,
            dc_block: config.dc_block,
        }
    }
}

/// Per-ear delay target and weight of one propagation path, for a fixed
/// listener pose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathTap {
    /// Un-smoothed delay in samples
    pub left_delay: f32,
    pub right_delay: f32,
    /// Attenuation x absorption x (1 -/+ level factor), gain excluded
    pub left_weight: f32,
    pub right_weight: f32,
}

impl PathTap {
    pub fn from_path(
        path: &PropagationPath,
        left_ear: Vec3,
        right_ear: Vec3,
        sample_rate: u32,
        params: &RenderParams,
    ) -> Self {
        let left_distance = path.total_distance(left_ear);
        let right_distance = path.total_distance(right_ear);
        let samples_per_meter = sample_rate as f32 / params.speed_of_sound;

        let level = level_factor(
            left_distance,
            right_distance,
            left_ear.distance(right_ear),
            params.level_divisor,
        );
        let amplitude =
            distance_attenuation((left_distance + right_distance) * 0.5) * path.absorption;

        Self {
            left_delay: left_distance * samples_per_meter,
            right_delay: right_distance * samples_per_meter,
            left_weight: amplitude * (1.0 - level),
            right_weight: amplitude * (1.0 + level),
        }
    }
}

/// Rounds a smoothed delay to a buffer offset.
#[inline]
fn delay_index(delay: f32, max_delay: usize) -> usize {
    (delay.round().max(0.0) as usize).min(max_delay)
}

/// Streams the dry signal through every valid path into a stereo delay line.
///
/// All storage is allocated in [`new`](Self::new). [`set_paths`](Self::set_paths)
/// and the per-sample methods never allocate, so both are safe to call from
/// the audio callback.
pub struct BinauralRenderer {
    sample_rate: u32,
    params: RenderParams,
    buffer: DelayBuffer,
    taps: Vec<PathTap>,
    /// Smoothed (left, right) delay per tap slot
    smoothed: Vec<(f32, f32)>,
    dc_filters: [DcBlocker; 2],
    bypass: bool,
}

impl BinauralRenderer {
    pub fn new(sample_rate: u32, buffer_len: usize, max_paths: usize, params: RenderParams) -> Self {
        Self {
            sample_rate,
            params,
            buffer: DelayBuffer::new(buffer_len),
            taps: Vec::with_capacity(max_paths),
            smoothed: vec![(0.0, 0.0); max_paths],
            dc_filters: [DcBlocker::default(); 2],
            bypass: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn set_params(&mut self, params: RenderParams) {
        if params.dc_block && !self.params.dc_block {
            self.dc_filters.iter_mut().for_each(DcBlocker::reset);
        }
        self.params = params;
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Number of paths currently rendered.
    pub fn active_paths(&self) -> usize {
        self.taps.len()
    }

    pub fn max_paths(&self) -> usize {
        self.smoothed.len()
    }

    /// Current tap targets, one per active path.
    pub fn taps(&self) -> &[PathTap] {
        &self.taps
    }

    /// Replaces the rendered paths with the valid paths of `paths`, heard from
    /// `listener`.
    ///
    /// Slots that were already active keep their smoothed delay; new slots
    /// start at their target. Returns how many valid paths did not fit.
    pub fn set_paths(&mut self, paths: &PathSet, listener: &Pose) -> usize {
        let (left_ear, right_ear) = listener.ear_positions(self.params.ear_separation);
        let previous = self.taps.len();
        let capacity = self.smoothed.len();

        self.taps.clear();
        let mut dropped = 0;
        for path in paths.valid_paths() {
            if self.taps.len() == capacity {
                dropped += 1;
                continue;
            }
            let tap = PathTap::from_path(path, left_ear, right_ear, self.sample_rate, &self.params);
            let slot = self.taps.len();
            if slot >= previous {
                self.smoothed[slot] = (tap.left_delay, tap.right_delay);
            }
            self.taps.push(tap);
        }
        dropped
    }

    /// Drops every path. The delay line keeps ringing out what it holds.
    pub fn clear_paths(&mut self) {
        self.taps.clear();
    }

    /// Scatters one dry sample through every path and returns the next
    /// output frame.
    #[inline]
    pub fn render_sample(&mut self, dry: f32) -> (f32, f32) {
        self.render_frame(Some(dry))
    }

    /// Advances the delay smoothing, scatters `dry` through every path when
    /// there is one, then reads the next output pair.
    fn render_frame(&mut self, dry: Option<f32>) -> (f32, f32) {
        let smoothing = self.params.delay_smoothing;
        let gain = self.params.gain;
        let max_delay = self.buffer.max_delay();

        for (tap, smoothed) in self.taps.iter().zip(self.smoothed.iter_mut()) {
            smoothed.0 += (tap.left_delay - smoothed.0) * smoothing;
            smoothed.1 += (tap.right_delay - smoothed.1) * smoothing;

            if let Some(dry) = dry {
                self.buffer.add(
                    delay_index(smoothed.0, max_delay),
                    gain * tap.left_weight * dry,
                    delay_index(smoothed.1, max_delay),
                    gain * tap.right_weight * dry,
                );
            }
        }

        let (left, right) = self.buffer.read_and_advance();
        if self.params.dc_block {
            (
                self.dc_filters[0].process(left),
                self.dc_filters[1].process(right),
            )
        } else {
            (left, right)
        }
    }

    /// Renders `dry` (one mono sample per frame) into the interleaved `output`.
    ///
    /// Channels past the second are silenced; a mono output gets the average
    /// of both ears. In bypass the dry signal is copied to every channel.
    pub fn process(&mut self, dry: &[f32], output: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for (frame, &sample) in output.chunks_exact_mut(channels).zip(dry.iter()) {
            if self.bypass {
                frame.fill(sample);
                continue;
            }
            let ears = self.render_frame(Some(sample));
            write_frame(frame, ears);
        }
    }

    /// Same output as [`process`](Self::process) with an all-zero dry signal,
    /// without scattering into the delay line. What is already in flight
    /// keeps ringing out.
    pub fn process_silence(&mut self, output: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for frame in output.chunks_exact_mut(channels) {
            if self.bypass {
                frame.fill(0.0);
                continue;
            }
            let ears = self.render_frame(None);
            write_frame(frame, ears);
        }
    }

    /// Silences the delay line and resets the filters.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.dc_filters.iter_mut().for_each(DcBlocker::reset);
    }
}

fn write_frame(frame: &mut [f32], (left, right): (f32, f32)) {
    if frame.len() == 1 {
        frame[0] = (left + right) * 0.5;
    } else {
        frame[0] = left;
        frame[1] = right;
        frame[2..].fill(0.0);
    }
}
