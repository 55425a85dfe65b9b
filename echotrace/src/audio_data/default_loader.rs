use crate::{
    audio_data::{AudioDataLoader, EchoTraceAudioData, LoadOptions},
    error::{EchoTraceError, Result},
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::{
    core::{
        audio::SampleBuffer,
        codecs::{CodecParameters, DecoderOptions},
        errors::Error,
        formats::{FormatOptions, FormatReader},
        io::MediaSourceStream,
        meta::MetadataOptions,
        probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Interleaved samples decoded from one track.
#[derive(Debug)]
pub(crate) struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Opens `path` and probes its container. File errors map to `Io`, an
/// unrecognized or malformed container to `AudioFormat`.
pub(crate) fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            EchoTraceError::AudioFormat(format!("{}: unrecognized or malformed container: {}", path.display(), e))
        })?;

    Ok(probed.format)
}

/// Codec parameters of the default track.
pub(crate) fn default_codec_params(format: &dyn FormatReader) -> Result<CodecParameters> {
    format
        .default_track()
        .map(|track| track.codec_params.clone())
        .ok_or_else(|| EchoTraceError::AudioLoading("No default audio track found".to_string()))
}

/// How the decode loop treats damaged input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeMode {
    /// Skip corrupt packets and keep whatever decodes
    Lenient,
    /// Fail on a corrupt packet or when fewer frames decode than the header declares
    Strict,
}

/// Decodes every packet of the default track to interleaved f32.
pub(crate) fn decode_default_track(
    format: &mut dyn FormatReader,
    mode: DecodeMode,
) -> Result<DecodedAudio> {
    let track = format
        .default_track()
        .ok_or_else(|| EchoTraceError::AudioLoading("No default audio track found".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| EchoTraceError::AudioLoading("Sample rate not found".to_string()))?;
    let channels = params
        .channels
        .ok_or_else(|| EchoTraceError::AudioLoading("Channel count not found".to_string()))?
        .count() as u16;

    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| EchoTraceError::AudioLoading(format!("Failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut scratch: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(e) => {
                return Err(EchoTraceError::AudioLoading(format!(
                    "Error reading packet: {}",
                    e
                )));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(e)) if mode == DecodeMode::Lenient => {
                log::warn!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(Error::DecodeError(e)) => {
                return Err(EchoTraceError::AudioFormat(format!("Corrupt packet: {}", e)));
            }
            Err(e) => {
                return Err(EchoTraceError::AudioLoading(format!(
                    "Error decoding packet: {}",
                    e
                )));
            }
        };

        let needed = decoded.capacity() * decoded.spec().channels.count();
        if scratch.as_ref().is_none_or(|buffer| buffer.capacity() < needed) {
            scratch = Some(SampleBuffer::<f32>::new(
                decoded.capacity() as u64,
                *decoded.spec(),
            ));
        }
        if let Some(buffer) = scratch.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }
    }

    if mode == DecodeMode::Strict {
        if let Some(declared) = params.n_frames {
            let decoded_frames = (samples.len() / channels.max(1) as usize) as u64;
            if decoded_frames < declared {
                return Err(EchoTraceError::AudioFormat(format!(
                    "data chunk truncated: {} of {} frames present",
                    decoded_frames, declared
                )));
            }
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Loads dry clips with symphonia (WAV, FLAC, MP3, OGG and what else the
/// default codec registry knows) and folds them to mono.
pub struct SymphoniaLoader;

impl AudioDataLoader for SymphoniaLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<EchoTraceAudioData>> {
        let mut format = open_format(path)?;
        let decoded = decode_default_track(format.as_mut(), DecodeMode::Lenient)?;
        log::info!(
            "Decoded {}: {} frames, {} channels at {} Hz",
            path.display(),
            decoded.samples.len() / decoded.channels.max(1) as usize,
            decoded.channels,
            decoded.sample_rate
        );

        let mut clip = EchoTraceAudioData::from_interleaved(
            &decoded.samples,
            decoded.sample_rate,
            decoded.channels,
            options.downmix,
        )?;
        if let Some(peak) = options.normalize_peak {
            clip = clip.normalized(peak);
        }
        Ok(Arc::new(clip))
    }
}
