//! Energy-based end-of-utterance detection.

use crate::AudioFrame;
use std::time::Duration;

/// RMS level above which a frame counts as speech.
const SPEECH_THRESHOLD: f32 = 0.02;

/// Trailing silence that ends a phrase once speech has been heard.
const PAUSE: Duration = Duration::from_millis(800);

/// Decides when a bounded utterance capture is complete.
#[derive(Debug, Clone)]
pub struct Endpointer {
    limit_samples: usize,
    pause_samples: usize,
    captured: usize,
    silence: usize,
    heard_speech: bool,
}

impl Endpointer {
    pub fn new(sample_rate_hz: u32, time_limit: Duration) -> Self {
        Self {
            limit_samples: samples_for(sample_rate_hz, time_limit),
            pause_samples: samples_for(sample_rate_hz, PAUSE),
            captured: 0,
            silence: 0,
            heard_speech: false,
        }
    }

    /// Feed the next frame. Returns `true` once the utterance is complete.
    pub fn push(&mut self, frame: &AudioFrame) -> bool {
        self.captured += frame.len();
        if frame.rms() > SPEECH_THRESHOLD {
            self.heard_speech = true;
            self.silence = 0;
        } else if self.heard_speech {
            self.silence += frame.len();
        }
        self.captured >= self.limit_samples || (self.heard_speech && self.silence >= self.pause_samples)
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }
}

fn samples_for(sample_rate_hz: u32, duration: Duration) -> usize {
    (u128::from(sample_rate_hz) * duration.as_millis() / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud(len: usize) -> AudioFrame {
        AudioFrame::new((0..len).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect())
    }

    #[test]
    fn test_silence_runs_to_limit() {
        let mut ep = Endpointer::new(1000, Duration::from_secs(1));
        let frame = AudioFrame::silence(100);
        let frames = (1..=20).find(|_| ep.push(&frame)).unwrap();
        assert_eq!(frames, 10);
        assert!(!ep.heard_speech());
    }

    #[test]
    fn test_pause_after_speech_ends_early() {
        let mut ep = Endpointer::new(1000, Duration::from_secs(5));
        assert!(!ep.push(&loud(100)));
        assert!(ep.heard_speech());
        let quiet = AudioFrame::silence(100);
        let mut pushed = 0;
        while !ep.push(&quiet) {
            pushed += 1;
        }
        // 800 ms of silence at 1 kHz is eight 100-sample frames
        assert_eq!(pushed + 1, 8);
    }
}
