use crate::config::EchoTraceWorldDesc;
use crate::error::{EchoTraceError, Result};
use crate::events::EchoTraceEvent;
use crate::render::RenderContext;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Callback that fills an interleaved f32 buffer
///
/// The callback receives:
/// - `buffer`: interleaved samples to overwrite
/// - `sample_rate`: stream sample rate
/// - `channels`: number of interleaved channels
///
/// Returns the number of frames written.
pub type AudioFillCallback = dyn FnMut(&mut [f32], u32, u16) -> usize + Send;

/// Output stream driving a render callback on the host's audio thread
pub struct EchoTraceEngine {
    desc: EchoTraceWorldDesc,
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    fill_callback: Option<Box<AudioFillCallback>>,
    events: Option<Sender<EchoTraceEvent>>,
}

/// Error callback for the cpal stream: logs and forwards as `EngineError`.
fn stream_error_callback(
    events: Option<Sender<EchoTraceEvent>>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        log::error!("Audio stream error: {}", err);
        if let Some(events) = &events {
            let _ = events.try_send(EchoTraceEvent::EngineError {
                error: err.to_string(),
            });
        }
    }
}

impl EchoTraceEngine {
    pub fn new(desc: EchoTraceWorldDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            desc,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
            fill_callback: None,
            events: None,
        })
    }

    /// Engine that renders a world through its [`RenderContext`]. Engine
    /// events go to the same channel as the world's render events.
    pub fn with_render_context(desc: EchoTraceWorldDesc, mut context: RenderContext) -> Result<Self> {
        let mut engine = Self::new(desc)?;
        engine.set_event_sender(context.event_sender());
        engine.set_fill_callback(move |buffer, _sample_rate, channels| {
            context.fill_buffer(buffer, channels)
        });
        Ok(engine)
    }

    /// Sets the callback run for every host block. Takes effect on the next `start`.
    pub fn set_fill_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut [f32], u32, u16) -> usize + Send + 'static,
    {
        self.fill_callback = Some(Box::new(callback));
    }

    /// Reports `EngineStarted`, `EngineStopped` and stream errors to `events`.
    pub fn set_event_sender(&mut self, events: Sender<EchoTraceEvent>) {
        self.events = Some(events);
    }

    fn emit(&self, event: EchoTraceEvent) {
        if let Some(events) = &self.events {
            let _ = events.try_send(event);
        }
    }

    /// Opens the default output device and starts streaming.
    ///
    /// The fill callback moves into the stream; after `stop` a new one must
    /// be set before starting again.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let fill_callback = self
            .fill_callback
            .take()
            .ok_or_else(|| EchoTraceError::Engine("No fill callback set".into()))?;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EchoTraceError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.block_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            EchoTraceError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config, fill_callback)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config, fill_callback)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config, fill_callback)?,
            other => {
                return Err(EchoTraceError::AudioFormat(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| EchoTraceError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);
        self.emit(EchoTraceEvent::EngineStarted);
        log::info!(
            "Audio engine started: {} Hz, {} channels, {} frames per block",
            self.desc.sample_rate,
            self.desc.channels,
            self.desc.block_size
        );

        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            self.emit(EchoTraceEvent::EngineStopped);
            log::info!(
                "Audio engine stopped after {} frames",
                self.frames_processed()
            );
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Frames rendered since the first start
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &EchoTraceWorldDesc {
        &self.desc
    }

    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut fill_callback: Box<AudioFillCallback>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let is_running = self.is_running.clone();
        let frames_processed = self.frames_processed.clone();
        let sample_rate = self.desc.sample_rate;
        let channels = self.desc.channels;
        let channels_usize = channels.max(1) as usize;

        // Host blocks larger than this are rendered in several calls
        let mut scratch = vec![0.0f32; self.desc.block_size.max(1) * channels_usize];
        let mut warned_oversized = false;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !is_running.load(Ordering::Relaxed) {
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0f32);
                        }
                        return;
                    }

                    if data.len() > scratch.len() && !warned_oversized {
                        warned_oversized = true;
                        log::warn!(
                            "Host block of {} samples exceeds the {}-sample render buffer, splitting",
                            data.len(),
                            scratch.len()
                        );
                    }

                    let chunk_len = scratch.len() - scratch.len() % channels_usize;
                    for out in data.chunks_mut(chunk_len.max(channels_usize)) {
                        let temp = &mut scratch[..out.len()];
                        let frames = fill_callback(temp, sample_rate, channels);
                        for (sample, value) in out.iter_mut().zip(temp.iter()) {
                            *sample = T::from_sample(*value);
                        }
                        frames_processed.fetch_add(frames, Ordering::Relaxed);
                    }
                },
                stream_error_callback(self.events.clone()),
                None,
            )
            .map_err(|e| EchoTraceError::AudioDevice(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }
}

impl Drop for EchoTraceEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
