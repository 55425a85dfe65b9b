use crate::audio_data::{EchoTraceAudioData, LoadOptions};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Source of dry clips.
///
/// The bundled [`SymphoniaLoader`](crate::audio_data::SymphoniaLoader) covers
/// the common container formats. Implement this trait to pull clips from
/// somewhere else (an asset pack, a network cache, a synthesizer).
///
/// # Example
///
/// ```ignore
/// use echotrace::audio_data::{AudioDataLoader, EchoTraceAudioData, LoadOptions};
/// use echotrace::error::Result;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// struct SilenceLoader;
///
/// impl AudioDataLoader for SilenceLoader {
///     fn load(&self, _path: &Path, _options: &LoadOptions) -> Result<Arc<EchoTraceAudioData>> {
///         Ok(Arc::new(EchoTraceAudioData::from_mono(vec![0.0; 48000], 48000)))
///     }
/// }
/// ```
pub trait AudioDataLoader {
    /// Loads and downmixes the clip at `path`.
    ///
    /// # Errors
    ///
    /// Returns an `EchoTraceError` if the file cannot be read or decoded.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<EchoTraceAudioData>>;
}
