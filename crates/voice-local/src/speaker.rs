use crate::{AudioSink, Result, Speaker, TtsEngine};
use tracing::info;

/// Synthesizes each line and plays it to completion.
///
/// Audio never leaves memory, so there are no intermediate files to name
/// or clean up.
/// Either half may be a trait object, as built by the backend factories.
pub struct SynthSpeaker<T: ?Sized, A: ?Sized> {
    voice_name: String,
    tts: Box<T>,
    sink: Box<A>,
}

impl<T: TtsEngine + ?Sized, A: AudioSink + ?Sized> SynthSpeaker<T, A> {
    pub fn new(voice_name: impl Into<String>, tts: Box<T>, sink: Box<A>) -> Self {
        Self {
            voice_name: voice_name.into(),
            tts,
            sink,
        }
    }
}

impl<T: TtsEngine + ?Sized, A: AudioSink + ?Sized> Speaker for SynthSpeaker<T, A> {
    fn speak(&mut self, text: &str) -> Result<()> {
        info!("{}: {}", self.voice_name, text);
        let pcm = self.tts.synthesize(text)?;
        let rate = self.tts.sample_rate();
        self.sink.play(&pcm, rate)
    }
}

/// Speaker for hosts without audio output: lines only go to the log.
pub struct LogSpeaker {
    voice_name: String,
}

impl LogSpeaker {
    pub fn new(voice_name: impl Into<String>) -> Self {
        Self {
            voice_name: voice_name.into(),
        }
    }
}

impl Speaker for LogSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        info!("{}: {}", self.voice_name, text);
        Ok(())
    }
}
