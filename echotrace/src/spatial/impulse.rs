use crate::acoustics::PathSet;
use crate::math::Pose;
use crate::spatial::{PathTap, RenderParams};

/// Number of taps in an impulse response built from a path set.
pub const IMPULSE_RESPONSE_LEN: usize = 2001;

/// Relative weight of the two taps neighboring each path's main tap.
pub const NEIGHBOR_TAP_WEIGHT: f32 = 1.0 / 3.0;

/// Static stereo impulse response derived from one path set.
///
/// Each path lands on the tap of its un-smoothed delay, with its two
/// neighbors at a third of the amplitude. This is a placeholder for a proper
/// head-related model and is intended for inspection, not for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
    /// Paths whose delay fell outside the response
    pub truncated_paths: usize,
}

impl ImpulseResponse {
    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
            sample_rate,
            truncated_paths: 0,
        }
    }

    /// Builds a [`IMPULSE_RESPONSE_LEN`]-tap response.
    pub fn from_paths(
        paths: &PathSet,
        listener: &Pose,
        sample_rate: u32,
        params: &RenderParams,
    ) -> Self {
        Self::with_len(paths, listener, sample_rate, params, IMPULSE_RESPONSE_LEN)
    }

    pub fn with_len(
        paths: &PathSet,
        listener: &Pose,
        sample_rate: u32,
        params: &RenderParams,
        len: usize,
    ) -> Self {
        let mut response = Self::silent(len, sample_rate);
        let (left_ear, right_ear) = listener.ear_positions(params.ear_separation);

        for path in paths.valid_paths() {
            let tap = PathTap::from_path(path, left_ear, right_ear, sample_rate, params);
            let left_index = tap.left_delay.round() as usize;
            let right_index = tap.right_delay.round() as usize;
            if left_index >= len && right_index >= len {
                response.truncated_paths += 1;
                continue;
            }
            scatter(&mut response.left, left_index, params.gain * tap.left_weight);
            scatter(&mut response.right, right_index, params.gain * tap.right_weight);
        }

        if response.truncated_paths > 0 {
            log::debug!(
                "{} paths fall outside the {}-tap impulse response",
                response.truncated_paths,
                len
            );
        }
        response
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Largest absolute tap value over both ears.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0_f32, |peak, tap| peak.max(tap.abs()))
    }

    /// Sum of squared taps over both ears.
    pub fn energy(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .map(|tap| tap * tap)
            .sum()
    }

    /// Index of the first non-zero tap on either ear.
    pub fn first_arrival(&self) -> Option<usize> {
        let first = |taps: &[f32]| taps.iter().position(|&tap| tap != 0.0);
        match (first(&self.left), first(&self.right)) {
            (Some(l), Some(r)) => Some(l.min(r)),
            (l, r) => l.or(r),
        }
    }
}

fn scatter(taps: &mut [f32], index: usize, amplitude: f32) {
    if let Some(tap) = taps.get_mut(index) {
        *tap += amplitude;
    }
    if let Some(before) = index.checked_sub(1).and_then(|i| taps.get_mut(i)) {
        *before += amplitude * NEIGHBOR_TAP_WEIGHT;
    }
    if let Some(after) = taps.get_mut(index + 1) {
        *after += amplitude * NEIGHBOR_TAP_WEIGHT;
    }
}
