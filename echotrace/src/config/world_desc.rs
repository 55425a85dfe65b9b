use crate::config::AcousticConfig;
use crate::error::{EchoTraceError, Result};

/// Configuration descriptor for an EchoTrace world
#[derive(Debug, Clone)]
pub struct EchoTraceWorldDesc {
    /// Sample rate of the render stream and of the delay lines
    pub sample_rate: u32,
    /// Nominal number of frames per audio callback. Also sizes the render scratch buffers.
    pub block_size: usize,
    /// Number of output channels (typically 2 for stereo)
    pub channels: u16,
    /// Maximum number of dry clips registered at once
    pub max_sources: usize,
    /// Maximum number of propagation paths the renderer keeps smoothing state for.
    /// Paths beyond this count in a snapshot are not rendered.
    pub max_paths: usize,
    /// Simulation and rendering parameters
    pub acoustics: AcousticConfig,
}

impl Default for EchoTraceWorldDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 1024,
            channels: 2,
            max_sources: 64,
            max_paths: 1024,
            acoustics: AcousticConfig::default(),
        }
    }
}

impl EchoTraceWorldDesc {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EchoTraceError::Configuration(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(EchoTraceError::Configuration(
                "Block size must be greater than 0".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(EchoTraceError::Configuration(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        self.acoustics.validate()
    }

    /// Length of each ear's delay line: two seconds of audio.
    pub fn delay_buffer_len(&self) -> usize {
        self.sample_rate as usize * 2
    }
}
