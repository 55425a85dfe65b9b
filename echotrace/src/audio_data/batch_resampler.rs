use crate::error::{EchoTraceError, Result};
use rubato::{FftFixedIn, Resampler};

/// Default number of input frames per resampler chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Offline resampler for mono dry clips.
///
/// Clips are resampled once, when they are registered with a world whose rate
/// differs from the file's, so the render thread only ever sees audio at the
/// stream rate.
pub struct BatchResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    chunk_size: usize,
}

impl BatchResampler {
    pub fn new(source_sample_rate: u32, target_sample_rate: u32, chunk_size: Option<usize>) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(EchoTraceError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            chunk_size: chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1),
        })
    }

    /// Number of output frames for `input_frames` input frames.
    pub fn output_len(&self, input_frames: usize) -> usize {
        (input_frames as f64 * self.ratio()).round() as usize
    }

    /// Resamples one channel. The tail is zero-padded to a full chunk and the
    /// result trimmed to [`output_len`](Self::output_len).
    pub fn resample(&self, samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(samples.to_vec());
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2,
            1,
        )
        .map_err(|e| EchoTraceError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let expected = self.output_len(samples.len());
        let mut output = Vec::with_capacity(expected + self.chunk_size);
        let mut chunk = vec![vec![0.0f32; self.chunk_size]];

        for block in samples.chunks(self.chunk_size) {
            chunk[0][..block.len()].copy_from_slice(block);
            chunk[0][block.len()..].fill(0.0);

            let waves_out = resampler
                .process(&chunk, None)
                .map_err(|e| EchoTraceError::AudioLoading(format!("Resampling error: {}", e)))?;
            if let Some(channel) = waves_out.first() {
                output.extend_from_slice(channel);
            }
        }

        output.resize(expected, 0.0);
        Ok(output)
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Target rate over source rate.
    pub fn ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_rate() {
        assert!(BatchResampler::new(0, 48000, None).is_err());
    }

    #[test]
    fn test_same_rate_is_identity() {
        let resampler = BatchResampler::new(48000, 48000, None).unwrap();
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resampler.resample(&input).unwrap(), input);
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let resampler = BatchResampler::new(96000, 48000, Some(512)).unwrap();
        let input: Vec<f32> = (0..5000).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.resample(&input).unwrap();
        assert_eq!(output.len(), 2500);
        assert_eq!(resampler.ratio(), 0.5);
    }
}
