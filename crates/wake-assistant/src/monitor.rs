//! Frame loop that watches the microphone for wake phrases

use crate::{AssistantError, CommandSession, Result, SessionOutcome, StopSignal};
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, error, info, trace, warn};
use voice_local::{
    AudioSource, DetectionEvent, Endpointer, RecordingBuffer, UtteranceCapture, WakeConfig,
    WakeWordDetector,
};

/// Device handles are built on the thread that runs the monitor, so they
/// need not be `Send`.
pub type BoxedDetector = Box<dyn WakeWordDetector>;
pub type BoxedSource = Box<dyn AudioSource>;

#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    /// Capture device index; `None` uses the system default.
    pub device_index: Option<usize>,
    /// Where to save everything captured, as a WAV file.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    /// Frames passed to the wake-word detector.
    pub frames_processed: u64,
    /// Frames read during sessions, including backlog discarded before
    /// each utterance.
    pub session_frames: u64,
    pub sessions: Vec<SessionOutcome>,
    pub recording_path: Option<PathBuf>,
}

/// Owns the capture device, the detector and the optional recording for the
/// whole run.
pub struct WakeMonitor {
    config: WakeConfig,
    detector: BoxedDetector,
    source: BoxedSource,
    recording: Option<RecordingBuffer>,
    output_path: Option<PathBuf>,
    stop: StopSignal,
}

impl WakeMonitor {
    /// Validate `config`, then build the detector and open the capture device
    /// at the detector's rate and frame length. Nothing is opened when the
    /// config is invalid.
    pub fn start<D, S>(
        config: WakeConfig,
        options: MonitorOptions,
        stop: StopSignal,
        make_detector: D,
        open_source: S,
    ) -> Result<Self>
    where
        D: FnOnce(&WakeConfig) -> voice_local::Result<BoxedDetector>,
        S: FnOnce(u32, usize, Option<usize>) -> voice_local::Result<BoxedSource>,
    {
        config.validate()?;
        let detector = make_detector(&config)?;
        let sample_rate = detector.sample_rate();
        let frame_length = detector.frame_length();
        let source = open_source(sample_rate, frame_length, options.device_index)
            .map_err(|e| AssistantError::Capture(e.to_string()))?;
        if source.sample_rate() != sample_rate {
            return Err(AssistantError::Capture(format!(
                "device opened at {} Hz, detector needs {} Hz",
                source.sample_rate(),
                sample_rate
            )));
        }

        info!("Listening for:");
        for (phrase, sensitivity) in config.phrases().iter().zip(config.sensitivities()) {
            info!("  - {} (sensitivity: {:.2})", phrase.name, sensitivity);
        }

        let recording = options
            .output_path
            .as_ref()
            .map(|_| RecordingBuffer::new(sample_rate));
        Ok(Self {
            config,
            detector,
            source,
            recording,
            output_path: options.output_path,
            stop,
        })
    }

    /// Run until the stop signal fires or capture fails. The device and
    /// detector are released and the recording is flushed on every exit path.
    pub fn run(self, session: &mut CommandSession) -> Result<MonitorReport> {
        let WakeMonitor {
            config,
            mut detector,
            mut source,
            mut recording,
            output_path,
            stop,
        } = self;

        let mut report = MonitorReport::default();
        let outcome = listen_loop(
            &config,
            detector.as_mut(),
            source.as_mut(),
            &mut recording,
            &stop,
            session,
            &mut report,
        );
        if let Err(e) = &outcome {
            error!(error = %e, "wake monitor stopped");
        }

        drop(source);
        drop(detector);
        info!("capture device and detector released");

        if let (Some(buffer), Some(path)) = (recording, output_path) {
            if buffer.is_empty() {
                info!("nothing recorded, skipping {}", path.display());
            } else {
                match buffer.flush(&path) {
                    Ok(()) => report.recording_path = Some(path),
                    Err(e) if outcome.is_ok() => return Err(e.into()),
                    Err(e) => error!(error = %e, "recording could not be saved"),
                }
            }
        }

        outcome.map(|()| report)
    }
}

fn listen_loop(
    config: &WakeConfig,
    detector: &mut dyn WakeWordDetector,
    source: &mut dyn AudioSource,
    recording: &mut Option<RecordingBuffer>,
    stop: &StopSignal,
    session: &mut CommandSession,
    report: &mut MonitorReport,
) -> Result<()> {
    while !stop.is_stopped() {
        let frame = source
            .read_frame()
            .map_err(|e| AssistantError::Capture(e.to_string()))?;
        report.frames_processed += 1;
        if let Some(buffer) = recording.as_mut() {
            buffer.push(frame.clone());
        }

        let Some(index) = detector.process(&frame)? else {
            trace!(frame = report.frames_processed, "no wake phrase");
            continue;
        };

        let phrase = match config.phrase(index) {
            Some(p) => p.name.clone(),
            None => {
                warn!(index, "detector reported an unknown phrase index");
                continue;
            }
        };
        let event = DetectionEvent {
            phrase_index: index,
            phrase,
            timestamp: OffsetDateTime::now_utc(),
        };
        info!("[{}] Detected {}", event.timestamp, event.phrase);

        let mut tap = FrameTap {
            source: &mut *source,
            recording: recording.as_mut(),
            stop,
            frames: 0,
        };
        let result = session.run(&event, &mut tap);
        report.session_frames += tap.frames;
        report.sessions.push(result?);
    }
    info!("stop requested");
    Ok(())
}

/// Utterance capture lent to a session. Reads from the monitor's device and
/// keeps recording, so the session never touches either directly.
struct FrameTap<'a> {
    source: &'a mut dyn AudioSource,
    recording: Option<&'a mut RecordingBuffer>,
    stop: &'a StopSignal,
    frames: u64,
}

impl UtteranceCapture for FrameTap<'_> {
    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn capture_utterance(&mut self, time_limit: Duration) -> voice_local::Result<Vec<i16>> {
        // Audio queued while the assistant was speaking or thinking is kept
        // in the recording but never treated as part of the utterance.
        let stale = self.source.drain()?;
        if !stale.is_empty() {
            debug!(frames = stale.len(), "discarded audio queued before capture");
        }
        self.frames += stale.len() as u64;
        if let Some(buffer) = self.recording.as_deref_mut() {
            for frame in stale {
                buffer.push(frame);
            }
        }

        let mut endpointer = Endpointer::new(self.source.sample_rate(), time_limit);
        let mut pcm = Vec::new();
        while !self.stop.is_stopped() {
            let frame = self.source.read_frame()?;
            self.frames += 1;
            let done = endpointer.push(&frame);
            pcm.extend_from_slice(frame.samples());
            if let Some(buffer) = self.recording.as_deref_mut() {
                buffer.push(frame);
            }
            if done {
                break;
            }
        }
        trace!(samples = pcm.len(), speech = endpointer.heard_speech(), "utterance captured");
        Ok(pcm)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{SessionEnd, SessionSettings};
    use intent_parser::{
        ActionExecutor, IntentConfig, IntentParser, MockCalculator, RecordingLauncher,
        RecordingSearch,
    };
    use std::cell::Cell;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use voice_local::recording::load_wav;
    use voice_local::{
        AudioFrame, MockDetector, MockSource, MockSpeaker, MockStt, ReleaseCounter, Speaker,
        SpeechToText, BACKLOG_LEVEL, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE_HZ,
    };

    /// Raises the stop signal once the farewell has been spoken.
    struct StopAfterFarewell {
        inner: MockSpeaker,
        stop: StopSignal,
    }

    impl Speaker for StopAfterFarewell {
        fn speak(&mut self, text: &str) -> voice_local::Result<()> {
            if text.starts_with("Ok bye") {
                self.stop.stop();
            }
            self.inner.speak(text)
        }
    }

    /// Keeps a copy of every utterance handed to the recognizer.
    struct HeardStt {
        inner: MockStt,
        heard: Arc<Mutex<Vec<Vec<i16>>>>,
    }

    impl SpeechToText for HeardStt {
        fn transcribe(&mut self, pcm: &[i16], sample_rate: u32) -> voice_local::Result<String> {
            self.heard.lock().unwrap().push(pcm.to_vec());
            self.inner.transcribe(pcm, sample_rate)
        }
    }

    /// Silent source that raises the stop signal after `frames` reads.
    struct StopAfter {
        inner: MockSource,
        frames: u64,
        stop: StopSignal,
    }

    impl AudioSource for StopAfter {
        fn sample_rate(&self) -> u32 {
            self.inner.sample_rate()
        }

        fn read_frame(&mut self) -> voice_local::Result<AudioFrame> {
            self.frames = self.frames.saturating_sub(1);
            if self.frames == 0 {
                self.stop.stop();
            }
            self.inner.read_frame()
        }
    }

    fn session(
        stt: impl SpeechToText + 'static,
        speaker: Box<dyn Speaker>,
        stop: &StopSignal,
    ) -> CommandSession {
        let executor = ActionExecutor::new(
            IntentConfig::default(),
            Box::new(MockCalculator::default()),
            Box::new(RecordingSearch::default()),
            Box::new(RecordingLauncher::default()),
        );
        let settings = SessionSettings {
            user_name: "Ada".into(),
            phrase_time_limit: Duration::from_millis(320),
        };
        CommandSession::new(
            settings,
            IntentParser::new(IntentConfig::default()),
            executor,
            Box::new(stt),
            speaker,
            stop.clone(),
        )
    }

    fn jarvis() -> WakeConfig {
        WakeConfig::from_keywords(&["jarvis".to_string()], None).unwrap()
    }

    fn open_mock(rate: u32, len: usize, _device: Option<usize>) -> voice_local::Result<BoxedSource> {
        Ok(Box::new(MockSource::new(rate, len)))
    }

    #[test]
    fn test_detection_on_frame_37_greets_before_listening() {
        let stop = StopSignal::new();
        let speaker = MockSpeaker::new();
        let mut session = session(
            MockStt::new(["bye"]),
            Box::new(StopAfterFarewell {
                inner: speaker.clone(),
                stop: stop.clone(),
            }),
            &stop,
        );
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions::default(),
            stop,
            |_| Ok(Box::new(MockDetector::new().match_at(37, 0)) as BoxedDetector),
            open_mock,
        )
        .unwrap();

        let report = monitor.run(&mut session).unwrap();
        assert_eq!(report.frames_processed, 37);
        assert_eq!(report.sessions.len(), 1);
        let outcome = &report.sessions[0];
        assert_eq!(outcome.phrase_index, 0);
        assert_eq!(outcome.phrase, "jarvis");
        assert_eq!(outcome.ended_by, SessionEnd::ExitPhrase);
        // 320 ms at 16 kHz is exactly ten 512-sample frames.
        assert_eq!(report.session_frames, 10);
        assert_eq!(speaker.spoken(), vec!["Hello, Ada.", "Ok bye, Ada."]);
    }

    #[test]
    fn test_config_mismatch_never_opens_device() {
        let bad: WakeConfig = serde_json::from_str(
            r#"{"phrases":[{"name":"jarvis","resource":"jarvis.ppn"}],"sensitivities":[0.5,0.7]}"#,
        )
        .unwrap();
        let opened = Cell::new(false);
        let built = Cell::new(false);
        let result = WakeMonitor::start(
            bad,
            MonitorOptions::default(),
            StopSignal::new(),
            |_| {
                built.set(true);
                Ok(Box::new(MockDetector::new()) as BoxedDetector)
            },
            |rate, len, _| {
                opened.set(true);
                open_mock(rate, len, None)
            },
        );
        assert!(matches!(result, Err(AssistantError::Config(_))));
        assert!(!built.get());
        assert!(!opened.get());
    }

    #[test]
    fn test_capture_failure_releases_once_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.wav");
        let detector_released = ReleaseCounter::default();
        let source_released = ReleaseCounter::default();
        let stop = StopSignal::new();
        let mut session = session(MockStt::default(), Box::new(MockSpeaker::new()), &stop);

        let det_counter = detector_released.clone();
        let src_counter = source_released.clone();
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions {
                device_index: Some(3),
                output_path: Some(path.clone()),
            },
            stop,
            move |_| {
                Ok(Box::new(MockDetector::new().with_release_counter(det_counter)) as BoxedDetector)
            },
            move |rate, len, device| {
                assert_eq!(device, Some(3));
                Ok(Box::new(
                    MockSource::new(rate, len)
                        .with_limit(10)
                        .with_release_counter(src_counter),
                ) as BoxedSource)
            },
        )
        .unwrap();

        let err = monitor.run(&mut session).unwrap_err();
        assert!(matches!(err, AssistantError::Capture(_)));
        assert_eq!(detector_released.load(Ordering::SeqCst), 1);
        assert_eq!(source_released.load(Ordering::SeqCst), 1);

        let (samples, rate) = load_wav(&path).unwrap();
        assert_eq!(rate, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(samples.len(), 10 * DEFAULT_FRAME_LENGTH);
    }

    #[test]
    fn test_session_frames_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.wav");
        let stop = StopSignal::new();
        let mut session = session(
            MockStt::new(["exit"]),
            Box::new(StopAfterFarewell {
                inner: MockSpeaker::new(),
                stop: stop.clone(),
            }),
            &stop,
        );
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions {
                device_index: None,
                output_path: Some(path.clone()),
            },
            stop,
            |_| Ok(Box::new(MockDetector::new().match_at(5, 0)) as BoxedDetector),
            open_mock,
        )
        .unwrap();

        let report = monitor.run(&mut session).unwrap();
        assert_eq!(report.recording_path.as_deref(), Some(path.as_path()));
        let (samples, _) = load_wav(&path).unwrap();
        let frames = (report.frames_processed + report.session_frames) as usize;
        assert_eq!(frames, 15);
        assert_eq!(samples.len(), frames * DEFAULT_FRAME_LENGTH);
    }

    #[test]
    fn test_stop_before_run_skips_empty_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.wav");
        let stop = StopSignal::new();
        let mut session = session(MockStt::default(), Box::new(MockSpeaker::new()), &stop);
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions {
                device_index: None,
                output_path: Some(path.clone()),
            },
            stop.clone(),
            |_| Ok(Box::new(MockDetector::new()) as BoxedDetector),
            open_mock,
        )
        .unwrap();
        stop.stop();

        let report = monitor.run(&mut session).unwrap();
        assert_eq!(report.frames_processed, 0);
        assert!(report.recording_path.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_backlog_is_recorded_but_not_transcribed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.wav");
        let stop = StopSignal::new();
        let heard = Arc::new(Mutex::new(Vec::new()));
        let stt = HeardStt {
            inner: MockStt::new(["bye"]),
            heard: heard.clone(),
        };
        let mut session = session(
            stt,
            Box::new(StopAfterFarewell {
                inner: MockSpeaker::new(),
                stop: stop.clone(),
            }),
            &stop,
        );
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions {
                device_index: None,
                output_path: Some(path.clone()),
            },
            stop,
            |_| Ok(Box::new(MockDetector::new().match_at(5, 0)) as BoxedDetector),
            |rate, len, _| Ok(Box::new(MockSource::new(rate, len).with_backlog(7)) as BoxedSource),
        )
        .unwrap();

        let report = monitor.run(&mut session).unwrap();
        let heard = heard.lock().unwrap();
        assert_eq!(heard.len(), 1);
        assert_eq!(heard[0].len(), 10 * DEFAULT_FRAME_LENGTH);
        assert!(heard[0].iter().all(|&s| s != BACKLOG_LEVEL));

        assert_eq!(report.session_frames, 17);
        let (samples, _) = load_wav(&path).unwrap();
        assert_eq!(samples.len(), (5 + 17) * DEFAULT_FRAME_LENGTH);
        let loud = samples.iter().filter(|&&s| s == BACKLOG_LEVEL).count();
        assert_eq!(loud, 7 * DEFAULT_FRAME_LENGTH);
    }

    #[test]
    fn test_second_phrase_and_unknown_index() {
        let stop = StopSignal::new();
        let mut session = session(
            MockStt::new(["exit"]),
            Box::new(StopAfterFarewell {
                inner: MockSpeaker::new(),
                stop: stop.clone(),
            }),
            &stop,
        );
        let config =
            WakeConfig::from_keywords(&["jarvis".to_string(), "computer".to_string()], None).unwrap();
        let monitor = WakeMonitor::start(
            config,
            MonitorOptions::default(),
            stop,
            |_| {
                Ok(Box::new(MockDetector::new().match_at(2, 5).match_at(4, 1)) as BoxedDetector)
            },
            open_mock,
        )
        .unwrap();

        let report = monitor.run(&mut session).unwrap();
        assert_eq!(report.frames_processed, 4);
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].phrase_index, 1);
        assert_eq!(report.sessions[0].phrase, "computer");
    }

    #[test]
    fn test_no_detection_means_no_sessions() {
        let stop = StopSignal::new();
        let speaker = MockSpeaker::new();
        let mut session = session(MockStt::default(), Box::new(speaker.clone()), &stop);
        let stopper = stop.clone();
        let monitor = WakeMonitor::start(
            jarvis(),
            MonitorOptions::default(),
            stop,
            |_| Ok(Box::new(MockDetector::new()) as BoxedDetector),
            move |rate, len, _| {
                Ok(Box::new(StopAfter {
                    inner: MockSource::new(rate, len),
                    frames: 50,
                    stop: stopper,
                }) as BoxedSource)
            },
        )
        .unwrap();

        let report = monitor.run(&mut session).unwrap();
        assert_eq!(report.frames_processed, 50);
        assert_eq!(report.session_frames, 0);
        assert!(report.sessions.is_empty());
        assert!(speaker.spoken().is_empty());
    }

    #[test]
    fn test_rate_mismatch_is_capture_error() {
        let result = WakeMonitor::start(
            jarvis(),
            MonitorOptions::default(),
            StopSignal::new(),
            |_| Ok(Box::new(MockDetector::new()) as BoxedDetector),
            |_, len, _| open_mock(8_000, len, None),
        );
        assert!(matches!(result, Err(AssistantError::Capture(_))));
    }
}
