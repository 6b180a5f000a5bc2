//! jarvis: listens for a wake phrase, then takes spoken commands until told
//! to stop.

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use intent_parser::{
    ActionExecutor, Calculator, DispatchError, IntentParser, MockCalculator, RecordingLauncher,
    RecordingSearch, SystemBrowser, SystemLauncher,
};
use std::path::PathBuf;
use tracing::{info, warn};
use voice_local::plugin::{
    new_stt_backend, new_tts_backend, new_wake_detector, SttBackendKind, TtsBackendKind,
    WakeBackendKind,
};
use voice_local::{
    LogSpeaker, MockDetector, MockSource, MockStt, Speaker, SpeechToText, TtsEngine, VoiceError,
    WakeConfig, BUILTIN_KEYWORDS,
};
use wake_assistant::{
    AssistantConfig, BoxedDetector, BoxedSource, CommandSession, MonitorOptions, MonitorReport,
    SessionSettings, StopSignal, WakeMonitor,
};

/// Played by the mock recognizer when no --script is given.
const DEMO_SCRIPT: &[&str] = &[
    "who are you",
    "calculate 2 plus 2",
    "search wikipedia rust programming language",
    "goodbye",
];

#[derive(Parser, Debug)]
#[command(name = "jarvis")]
#[command(about = "Wake-word voice assistant")]
struct Args {
    /// Built-in wake phrases, comma separated
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Keyword files; takes precedence over --keywords
    #[arg(long, value_delimiter = ',')]
    keyword_file_paths: Vec<PathBuf>,

    /// Detector model file. Reserved for model-based wake engines; the
    /// transcript detector logs and ignores it.
    #[arg(long)]
    model_file_path: Option<PathBuf>,

    /// One value in [0, 1] per wake phrase (default 0.5 each)
    #[arg(long, value_delimiter = ',')]
    sensitivities: Option<Vec<f32>>,

    #[arg(long)]
    input_audio_device_index: Option<usize>,

    /// Save all captured audio to this WAV file on shutdown
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// List capture devices and exit
    #[arg(long, action = ArgAction::SetTrue)]
    show_audio_devices_info: bool,

    /// Assistant settings, created with defaults if missing
    #[arg(long, default_value = "jarvis.json")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = Backend::Mock)]
    stt_backend: Backend,

    #[arg(long, value_enum, default_value_t = Backend::Mock)]
    tts_backend: Backend,

    /// Run without audio hardware: scripted detector, recognizer and actions
    #[arg(long, action = ArgAction::SetTrue)]
    mock: bool,

    /// Transcripts returned by the mock recognizer, in order
    #[arg(long, requires = "mock")]
    script: Vec<String>,

    /// Frame on which the mock detector fires
    #[arg(long, default_value_t = 37)]
    mock_trigger_frame: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    HfInference,
}

impl From<Backend> for SttBackendKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Mock => SttBackendKind::Mock,
            Backend::HfInference => SttBackendKind::HfInference,
        }
    }
}

impl From<Backend> for TtsBackendKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Mock => TtsBackendKind::Mock,
            Backend::HfInference => TtsBackendKind::HfInference,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let args = Args::parse();

    if args.show_audio_devices_info {
        return show_audio_devices();
    }

    let config = AssistantConfig::load_or_create(&args.config)
        .map_err(|e| anyhow!("failed to load {}: {}", args.config.display(), e))?;
    let wake_config = build_wake_config(&args)?;

    let stop = StopSignal::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            interrupt.stop();
        }
    });

    // Audio handles are not Send, so everything is built on the worker thread.
    let worker =
        tokio::task::spawn_blocking(move || run_assistant(&args, &config, wake_config, stop));
    let report = worker.await.context("assistant worker panicked")??;

    info!(
        frames = report.frames_processed,
        sessions = report.sessions.len(),
        "assistant stopped"
    );
    if let Some(path) = &report.recording_path {
        info!("recording saved to {}", path.display());
    }
    Ok(())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_wake_config(args: &Args) -> Result<WakeConfig> {
    let config = if !args.keyword_file_paths.is_empty() {
        WakeConfig::from_resource_paths(&args.keyword_file_paths, args.sensitivities.clone())?
    } else {
        let keywords = if !args.keywords.is_empty() {
            args.keywords.clone()
        } else if args.mock {
            vec!["jarvis".to_string()]
        } else {
            bail!(
                "either --keywords or --keyword-file-paths must be set (available: {})",
                BUILTIN_KEYWORDS.join(", ")
            );
        };
        WakeConfig::from_keywords(&keywords, args.sensitivities.clone())?
    };
    Ok(match &args.model_file_path {
        Some(model) => config.with_model_path(model.clone()),
        None => config,
    })
}

fn run_assistant(
    args: &Args,
    config: &AssistantConfig,
    wake_config: WakeConfig,
    stop: StopSignal,
) -> Result<MonitorReport> {
    let mut session = build_session(args, config, &stop)?;
    let options = MonitorOptions {
        device_index: args.input_audio_device_index,
        output_path: args.output_path.clone(),
    };

    let monitor = if args.mock {
        let trigger = args.mock_trigger_frame;
        WakeMonitor::start(
            wake_config,
            options,
            stop,
            move |_| Ok(Box::new(MockDetector::new().match_at(trigger, 0)) as BoxedDetector),
            |rate, frame_length, _| {
                Ok(Box::new(MockSource::new(rate, frame_length).realtime()) as BoxedSource)
            },
        )?
    } else {
        let stt_kind = SttBackendKind::from(args.stt_backend);
        let stt_config = config.stt.clone();
        WakeMonitor::start(
            wake_config,
            options,
            stop,
            move |wake| {
                let stt = new_stt_backend(stt_kind, stt_config)?;
                let detector: BoxedDetector = new_wake_detector(WakeBackendKind::Transcript, wake, stt)?;
                Ok(detector)
            },
            open_microphone,
        )?
    };

    Ok(monitor.run(&mut session)?)
}

fn build_session(
    args: &Args,
    config: &AssistantConfig,
    stop: &StopSignal,
) -> Result<CommandSession> {
    let intents = config.intents.clone();
    let parser = IntentParser::new(intents.clone());

    let (stt, executor): (Box<dyn SpeechToText>, ActionExecutor) = if args.mock {
        let script: Vec<String> = if args.script.is_empty() {
            DEMO_SCRIPT.iter().map(|s| s.to_string()).collect()
        } else {
            args.script.clone()
        };
        let executor = ActionExecutor::new(
            intents,
            Box::new(MockCalculator::default().with_answer("2 plus 2", "4")),
            Box::new(RecordingSearch::default()),
            Box::new(RecordingLauncher::default()),
        );
        (Box::new(MockStt::new(script)) as Box<dyn SpeechToText>, executor)
    } else {
        let executor = ActionExecutor::new(
            intents,
            calculator(),
            Box::new(SystemBrowser),
            Box::new(SystemLauncher::new(config.apps.clone())),
        );
        let stt: Box<dyn SpeechToText> = new_stt_backend(args.stt_backend.into(), config.stt.clone())?;
        (stt, executor)
    };

    let speaker = build_speaker(args, config)?;
    Ok(CommandSession::new(
        SessionSettings::from(config),
        parser,
        executor,
        stt,
        speaker,
        stop.clone(),
    ))
}

fn build_speaker(args: &Args, config: &AssistantConfig) -> Result<Box<dyn Speaker>> {
    let name = config.intents.assistant_name.clone();
    if args.mock {
        return Ok(Box::new(LogSpeaker::new(name)));
    }
    let tts = new_tts_backend(args.tts_backend.into(), config.tts.clone())?;
    Ok(open_speaker(name, tts))
}

#[cfg(feature = "audio")]
fn open_speaker(name: String, tts: Box<dyn TtsEngine + Send>) -> Box<dyn Speaker> {
    use voice_local::{AudioSink, CpalSink, SynthSpeaker};
    match CpalSink::new() {
        Ok(sink) => Box::new(SynthSpeaker::<dyn TtsEngine + Send, dyn AudioSink>::new(
            name,
            tts,
            Box::new(sink),
        )),
        Err(e) => {
            warn!(error = %e, "no audio output, responses go to the log only");
            Box::new(LogSpeaker::new(name))
        }
    }
}

#[cfg(not(feature = "audio"))]
fn open_speaker(name: String, _tts: Box<dyn TtsEngine + Send>) -> Box<dyn Speaker> {
    warn!("built without the `audio` feature, responses go to the log only");
    Box::new(LogSpeaker::new(name))
}

#[cfg(feature = "audio")]
fn open_microphone(
    sample_rate: u32,
    frame_length: usize,
    device_index: Option<usize>,
) -> voice_local::Result<BoxedSource> {
    let mic = voice_local::mic::MicSource::open(sample_rate, frame_length, device_index)?;
    Ok(Box::new(mic))
}

#[cfg(not(feature = "audio"))]
fn open_microphone(_: u32, _: usize, _: Option<usize>) -> voice_local::Result<BoxedSource> {
    Err(VoiceError::Unavailable(
        "built without the `audio` feature; rebuild with it or pass --mock",
    ))
}

#[cfg(feature = "audio")]
fn show_audio_devices() -> Result<()> {
    for device in voice_local::mic::list_input_devices()? {
        println!(
            "index: {}, device name: {}, default sample rate: {}, max input channels: {}",
            device.index,
            device.name,
            device
                .default_sample_rate
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            device.max_input_channels
        );
    }
    Ok(())
}

#[cfg(not(feature = "audio"))]
fn show_audio_devices() -> Result<()> {
    bail!("device listing needs the `audio` feature")
}

/// Stand-in when no calculation service is configured. Every query fails as
/// a network error so the session offers a web search instead.
struct NoCalculator;

impl Calculator for NoCalculator {
    fn query(&mut self, _input: &str) -> intent_parser::Result<Option<String>> {
        Err(DispatchError::Network(
            "no calculation service configured".to_string(),
        ))
    }
}

#[cfg(feature = "http")]
fn calculator() -> Box<dyn Calculator + Send> {
    match intent_parser::WolframAlpha::from_env() {
        Ok(service) => Box::new(service),
        Err(e) => {
            warn!(error = %e, "calculation service unavailable");
            Box::new(NoCalculator)
        }
    }
}

#[cfg(not(feature = "http"))]
fn calculator() -> Box<dyn Calculator + Send> {
    Box::new(NoCalculator)
}
