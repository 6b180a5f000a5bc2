//! Blocking playback to the default output device.

use crate::resample::resample_linear;
use crate::{AudioSink, Result, VoiceError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub struct CpalSink {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl CpalSink {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VoiceError::Playback("no output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| VoiceError::Playback(format!("output config: {e}")))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(VoiceError::Playback(format!(
                "unsupported output format: {:?}",
                supported.sample_format()
            )));
        }
        let config = supported.config();
        debug!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio playback initialized"
        );
        Ok(Self { device, config })
    }
}

impl AudioSink for CpalSink {
    fn play(&mut self, pcm: &[i16], sample_rate: u32) -> Result<()> {
        if pcm.is_empty() {
            return Ok(());
        }

        let out_rate = self.config.sample_rate.0;
        let samples: Arc<Vec<f32>> = Arc::new(
            resample_linear(pcm, sample_rate, out_rate)
                .into_iter()
                .map(|s| f32::from(s) / 32768.0)
                .collect(),
        );
        let channels = usize::from(self.config.channels.max(1));
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            self.device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let pos = position.load(Ordering::Relaxed);
                            let sample = match samples.get(pos) {
                                Some(s) => {
                                    position.store(pos + 1, Ordering::Relaxed);
                                    *s
                                }
                                None => {
                                    finished.store(true, Ordering::Release);
                                    0.0
                                }
                            };
                            frame.iter_mut().for_each(|out| *out = sample);
                        }
                    },
                    |err| error!("audio playback error: {err}"),
                    None,
                )
                .map_err(|e| VoiceError::Playback(e.to_string()))?
        };
        stream
            .play()
            .map_err(|e| VoiceError::Playback(e.to_string()))?;

        let duration_ms = samples.len() as u64 * 1000 / u64::from(out_rate.max(1));
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();
        while !finished.load(Ordering::Acquire) && start.elapsed() < timeout {
            std::thread::sleep(Duration::from_millis(20));
        }
        drop(stream);
        debug!(samples = samples.len(), "playback complete");
        Ok(())
    }
}
