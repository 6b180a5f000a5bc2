//! Session-wide capture buffer persisted as a 16-bit mono WAV.

use crate::{AudioFrame, Result, VoiceError};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// Append-only sequence of captured frames at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct RecordingBuffer {
    sample_rate_hz: u32,
    frames: Vec<AudioFrame>,
}

impl RecordingBuffer {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: AudioFrame) {
        self.frames.push(frame);
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(AudioFrame::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(AudioFrame::is_empty)
    }

    /// All samples in capture order.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.frames.iter().flat_map(|f| f.samples().iter().copied())
    }

    /// Write the buffer as a single WAV file. Consumes the buffer so a
    /// recording can only ever be flushed once.
    pub fn flush(self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in self.samples() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        info!(
            path = %path.display(),
            frames = self.frames.len(),
            sample_rate = self.sample_rate_hz,
            "recording saved"
        );
        Ok(())
    }
}

/// Read back a mono 16-bit WAV as `(samples, sample_rate)`.
pub fn load_wav(path: &Path) -> Result<(Vec<i16>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let rate = reader.spec().sample_rate;
    let samples = reader.samples::<i16>().collect::<core::result::Result<Vec<_>, _>>()?;
    Ok((samples, rate))
}

/// Encode mono PCM as an in-memory 16-bit WAV.
pub fn encode_wav(pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
    for &sample in pcm {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(bytes)
}

/// Decode a WAV held in memory to mono 16-bit PCM. Multi-channel input
/// keeps the first channel.
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<i16>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<core::result::Result<_, _>>()?,
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            let shift = u32::from(bits).saturating_sub(16);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<core::result::Result<_, _>>()?
        }
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<core::result::Result<_, _>>()?,
        (format, bits) => {
            return Err(VoiceError::Synthesis(format!(
                "unsupported WAV encoding: {format:?} {bits}-bit"
            )))
        }
    };
    let mono = interleaved.chunks(channels).map(|frame| frame[0]).collect();
    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.wav");

        let mut buffer = RecordingBuffer::new(16_000);
        let f1 = AudioFrame::new(vec![0, 1, -1, i16::MAX]);
        let f2 = AudioFrame::new(vec![i16::MIN, 42, -42, 7]);
        buffer.push(f1.clone());
        buffer.push(f2.clone());
        assert_eq!(buffer.sample_count(), 8);

        buffer.flush(&path).unwrap();

        let (samples, rate) = load_wav(&path).unwrap();
        assert_eq!(rate, 16_000);
        let expected: Vec<i16> = f1.samples().iter().chain(f2.samples()).copied().collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_in_memory_wav() {
        let pcm = vec![5, -5, 300, -300, 0];
        let bytes = encode_wav(&pcm, 22_050).unwrap();
        let (decoded, rate) = decode_wav(&bytes).unwrap();
        assert_eq!(rate, 22_050);
        assert_eq!(decoded, pcm);
        assert!(decode_wav(b"not a wav").is_err());
    }

    #[test]
    fn test_empty_buffer() {
        let mut buffer = RecordingBuffer::new(8_000);
        assert!(buffer.is_empty());
        buffer.push(AudioFrame::new(Vec::new()));
        assert!(buffer.is_empty());
        buffer.push(AudioFrame::silence(16));
        assert!(!buffer.is_empty());
        assert_eq!(buffer.frame_count(), 2);
    }
}
