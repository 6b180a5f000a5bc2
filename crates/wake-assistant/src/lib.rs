//! wake-assistant: the wake-word monitor and the command session it hands
//! control to after each detection.
//!
//! The monitor owns the capture device for the whole run. A session borrows
//! it through an [`voice_local::UtteranceCapture`] handle, so wake detection
//! and conversation never consume audio at the same time.

mod error;
pub use error::{AssistantError, Result};

mod state;
pub use state::{SessionEvent, SessionState};

mod stop;
pub use stop::StopSignal;

mod config;
pub use config::AssistantConfig;

mod session;
pub use session::{CommandSession, SessionEnd, SessionOutcome, SessionSettings};

mod monitor;
pub use monitor::{BoxedDetector, BoxedSource, MonitorOptions, MonitorReport, WakeMonitor};
