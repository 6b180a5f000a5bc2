//! cpal microphone capture delivering fixed-size mono frames.

use crate::queue::{chunk_queue, ChunkQueue, ChunkSender, CAPTURE_QUEUE_CHUNKS};
use crate::resample::resample_linear;
use crate::{AudioFrame, AudioSource, Result, VoiceError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

/// One row of the device listing.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub index: usize,
    pub name: String,
    pub default_sample_rate: Option<u32>,
    pub max_input_channels: u16,
}

/// Enumerate capture devices in host order. The index is what
/// [`MicSource::open`] accepts.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| VoiceError::Capture(format!("enumerate devices: {e}")))?;
    let mut out = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let default_sample_rate = device.default_input_config().ok().map(|c| c.sample_rate().0);
        let max_input_channels = device
            .supported_input_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);
        out.push(InputDeviceInfo {
            index,
            name,
            default_sample_rate,
            max_input_channels,
        });
    }
    Ok(out)
}

/// Open capture stream. Dropping it closes the device.
pub struct MicSource {
    _stream: cpal::Stream,
    queue: ChunkQueue,
    device_rate: u32,
    sample_rate_hz: u32,
    frame_length: usize,
    pending: Vec<i16>,
}

impl MicSource {
    /// Open `device_index` (or the default input) for mono capture at
    /// `sample_rate_hz`. Devices that cannot run at that rate are captured
    /// at their default rate and resampled.
    pub fn open(sample_rate_hz: u32, frame_length: usize, device_index: Option<usize>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_index {
            Some(index) => host
                .input_devices()
                .map_err(|e| VoiceError::Capture(format!("enumerate devices: {e}")))?
                .nth(index)
                .ok_or_else(|| VoiceError::Capture(format!("no input device at index {index}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| VoiceError::Capture("no default input device".into()))?,
        };

        let wanted = cpal::SampleRate(sample_rate_hz);
        let supported = device
            .supported_input_configs()
            .map_err(|e| VoiceError::Capture(format!("input configs: {e}")))?
            .filter(|c| c.min_sample_rate() <= wanted && c.max_sample_rate() >= wanted)
            .min_by_key(|c| c.channels())
            .map(|c| c.with_sample_rate(wanted));
        let config = match supported {
            Some(c) => c,
            None => device
                .default_input_config()
                .map_err(|e| VoiceError::Capture(format!("input config: {e}")))?,
        };
        let device_rate = config.sample_rate().0;
        let channels = config.channels();

        let (tx, queue) = chunk_queue(CAPTURE_QUEUE_CHUNKS);
        let err_fn = |err: cpal::StreamError| error!("input stream error: {err}");

        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => build_i16_stream(&device, &config.into(), channels, tx, err_fn)?,
            cpal::SampleFormat::U16 => build_u16_stream(&device, &config.into(), channels, tx, err_fn)?,
            cpal::SampleFormat::F32 => build_f32_stream(&device, &config.into(), channels, tx, err_fn)?,
            other => {
                return Err(VoiceError::Capture(format!("unsupported sample format: {other:?}")))
            }
        };
        stream
            .play()
            .map_err(|e| VoiceError::Capture(format!("stream play: {e}")))?;

        info!(
            device = %device.name().unwrap_or_default(),
            device_rate,
            channels,
            sample_rate = sample_rate_hz,
            frame_length,
            "microphone opened"
        );

        Ok(Self {
            _stream: stream,
            queue,
            device_rate,
            sample_rate_hz,
            frame_length,
            pending: Vec::with_capacity(frame_length * 4),
        })
    }
}

impl AudioSource for MicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate_hz
    }

    fn read_frame(&mut self) -> Result<AudioFrame> {
        while self.pending.len() < self.frame_length {
            let chunk = self.queue.recv()?;
            self.append(&chunk);
        }
        Ok(self.split_frame())
    }

    fn drain(&mut self) -> Result<Vec<AudioFrame>> {
        for chunk in self.queue.take_queued()? {
            self.append(&chunk);
        }
        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_length {
            frames.push(self.split_frame());
        }
        Ok(frames)
    }
}

impl MicSource {
    fn append(&mut self, chunk: &[i16]) {
        if self.device_rate == self.sample_rate_hz {
            self.pending.extend_from_slice(chunk);
        } else {
            self.pending
                .extend(resample_linear(chunk, self.device_rate, self.sample_rate_hz));
        }
    }

    fn split_frame(&mut self) -> AudioFrame {
        let rest = self.pending.split_off(self.frame_length);
        AudioFrame::new(std::mem::replace(&mut self.pending, rest))
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        debug!("microphone closed");
    }
}

// Take first channel for mono
fn send_mono<T: Copy>(data: &[T], channels: u16, tx: &ChunkSender, convert: impl Fn(T) -> i16) {
    let mono: Vec<i16> = data
        .chunks_exact(usize::from(channels.max(1)))
        .map(|frame| convert(frame[0]))
        .collect();
    tx.send(mono);
}

fn build_i16_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    tx: ChunkSender,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[i16], _| send_mono(data, channels, &tx, |s| s),
            err_fn,
            None,
        )
        .map_err(|e| VoiceError::Capture(format!("build stream: {e}")))
}

fn build_u16_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    tx: ChunkSender,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream> {
    device
        .build_input_stream(
            config,
            // u16 to i16 centered
            move |data: &[u16], _| send_mono(data, channels, &tx, |s| (i32::from(s) - 32768) as i16),
            err_fn,
            None,
        )
        .map_err(|e| VoiceError::Capture(format!("build stream: {e}")))
}

fn build_f32_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    tx: ChunkSender,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _| {
                send_mono(data, channels, &tx, |s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            },
            err_fn,
            None,
        )
        .map_err(|e| VoiceError::Capture(format!("build stream: {e}")))
}
