mod batch_resampler;
mod default_loader;
mod impulse_file;
mod load_options;
mod loader;

use crate::error::{EchoTraceError, Result};
pub use batch_resampler::{BatchResampler, DEFAULT_CHUNK_SIZE};
pub use default_loader::SymphoniaLoader;
pub use impulse_file::load_impulse_response_wav;
pub use load_options::{Downmix, LoadOptions};
pub use loader::AudioDataLoader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Mono dry clip, the signal every propagation path carries.
///
/// Samples are shared behind an `Arc`, so cloning a clip (or handing it to the
/// render thread) never copies audio.
#[derive(Debug, Clone)]
pub struct EchoTraceAudioData {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl EchoTraceAudioData {
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Folds interleaved multi-channel audio into a mono clip.
    pub fn from_interleaved(
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        downmix: Downmix,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(EchoTraceError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        let width = channels as usize;
        let mono: Vec<f32> = match downmix {
            Downmix::Average => samples
                .chunks_exact(width)
                .map(|frame| frame.iter().sum::<f32>() / width as f32)
                .collect(),
            Downmix::Channel(channel) if channel < channels => samples
                .chunks_exact(width)
                .map(|frame| frame[channel as usize])
                .collect(),
            Downmix::Channel(channel) => {
                return Err(EchoTraceError::AudioFormat(format!(
                    "Channel {} out of range (max: {})",
                    channel,
                    channels - 1
                )));
            }
        };
        Ok(Self::from_mono(mono, sample_rate))
    }

    /// Loads a clip with the bundled symphonia loader and default options.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        SymphoniaLoader.load(path.as_ref(), &LoadOptions::default())
    }

    pub fn from_path_with_options(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Arc<Self>> {
        SymphoniaLoader.load(path.as_ref(), options)
    }

    pub fn from_path_with_loader<L: AudioDataLoader>(
        path: impl AsRef<Path>,
        loader: &L,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        loader.load(path.as_ref(), options)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()))
    }

    /// Copy scaled so the peak equals `target`. Silent clips are returned as is.
    pub fn normalized(&self, target: f32) -> Self {
        let peak = self.peak();
        if peak <= f32::EPSILON {
            return self.clone();
        }
        let scale = target / peak;
        Self::from_mono(
            self.samples.iter().map(|s| s * scale).collect(),
            self.sample_rate,
        )
    }

    /// Resamples to `target_sample_rate` with rubato.
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.sample_rate {
            return Ok(self.clone());
        }
        let resampler = BatchResampler::new(self.sample_rate, target_sample_rate, None)?;
        let samples = resampler.resample(&self.samples)?;
        log::debug!(
            "Resampled clip from {} Hz to {} Hz ({} -> {} frames)",
            self.sample_rate,
            target_sample_rate,
            self.samples.len(),
            samples.len()
        );
        Ok(Self::from_mono(samples, target_sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_downmix() {
        let clip =
            EchoTraceAudioData::from_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 48000, 2, Downmix::Average)
                .unwrap();
        assert_eq!(clip.samples(), &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_channel_downmix() {
        let interleaved = [1.0, 2.0, 3.0, 4.0];
        let clip =
            EchoTraceAudioData::from_interleaved(&interleaved, 48000, 2, Downmix::Channel(1)).unwrap();
        assert_eq!(clip.samples(), &[2.0, 4.0]);
        assert!(
            EchoTraceAudioData::from_interleaved(&interleaved, 48000, 2, Downmix::Channel(2)).is_err()
        );
    }

    #[test]
    fn test_duration_and_normalize() {
        let clip = EchoTraceAudioData::from_mono(vec![0.25, -0.5, 0.1, 0.0], 4);
        assert_eq!(clip.duration(), Duration::from_secs(1));
        let louder = clip.normalized(1.0);
        assert!((louder.peak() - 1.0).abs() < 1e-6);
        assert!((louder.samples()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_changes_rate() {
        let clip = EchoTraceAudioData::from_mono(vec![0.0; 4410], 44100);
        let resampled = clip.resample(48000).unwrap();
        assert_eq!(resampled.sample_rate(), 48000);
        assert_eq!(resampled.len(), 4800);
    }
}
