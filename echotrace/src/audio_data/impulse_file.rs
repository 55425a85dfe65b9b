use crate::audio_data::default_loader::{
    DecodeMode, decode_default_track, default_codec_params, open_format,
};
use crate::error::{EchoTraceError, Result};
use std::path::Path;
use symphonia::core::codecs::{CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_S16LE};

/// Loads a measured impulse response from a WAV file.
///
/// Returns the interleaved samples normalized to f32 (16-bit PCM divided by
/// 32768), the sample rate and the channel count. Only 16-bit integer PCM and
/// 32-bit float encodings are accepted.
///
/// # Errors
///
/// - `Io` when the file cannot be opened
/// - `AudioFormat` when the RIFF/WAVE structure or its fmt/data chunk is
///   missing or malformed, the data chunk holds fewer frames than it
///   declares, or the encoding is not supported
///
/// No partial buffer is ever returned.
pub fn load_impulse_response_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32, u16)> {
    let path = path.as_ref();
    let mut format = open_format(path)?;

    let params = default_codec_params(format.as_ref())?;
    if params.codec != CODEC_TYPE_PCM_S16LE && params.codec != CODEC_TYPE_PCM_F32LE {
        return Err(EchoTraceError::AudioFormat(format!(
            "{}: unsupported encoding (bits per sample: {:?}), expected 16-bit PCM or 32-bit float",
            path.display(),
            params.bits_per_sample
        )));
    }

    let decoded = decode_default_track(format.as_mut(), DecodeMode::Strict).map_err(|e| match e {
        EchoTraceError::AudioLoading(msg) => {
            EchoTraceError::AudioFormat(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    log::info!(
        "Loaded impulse response {}: {} samples, {} channels, {} Hz",
        path.display(),
        decoded.samples.len(),
        decoded.channels,
        decoded.sample_rate
    );
    Ok((decoded.samples, decoded.sample_rate, decoded.channels))
}
