//! Carrying out classified intents

use crate::{
    AppTarget, DispatchError, Intent, IntentConfig, Result, SearchRequest, Utterance,
};
use std::time::Instant;
use tracing::{debug, info};
use voice_local::Speaker;

/// Arithmetic / knowledge lookup service.
pub trait Calculator {
    /// `Ok(None)` when the service has no answer for the query.
    fn query(&mut self, input: &str) -> Result<Option<String>>;
}

/// Opens a routed search in a browser.
pub trait WebSearch {
    fn open(&mut self, request: &SearchRequest) -> Result<()>;
}

pub trait AppLauncher {
    fn launch(&mut self, target: AppTarget) -> Result<()>;
}

/// What the executor did for one intent
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub action: &'static str,
    /// Spoken responses, in order
    pub responses: Vec<String>,
    pub execution_time_ms: f64,
}

impl ExecutionReport {
    fn new(action: &'static str) -> Self {
        Self {
            action,
            responses: Vec::new(),
            execution_time_ms: 0.0,
        }
    }
}

/// Dispatches intents to the calculator, browser and launcher, speaking the
/// replies through the supplied speaker.
pub struct ActionExecutor {
    config: IntentConfig,
    calculator: Box<dyn Calculator + Send>,
    search: Box<dyn WebSearch + Send>,
    launcher: Box<dyn AppLauncher + Send>,
}

impl ActionExecutor {
    pub fn new(
        config: IntentConfig,
        calculator: Box<dyn Calculator + Send>,
        search: Box<dyn WebSearch + Send>,
        launcher: Box<dyn AppLauncher + Send>,
    ) -> Self {
        Self {
            config,
            calculator,
            search,
            launcher,
        }
    }

    pub fn execute(&mut self, intent: &Intent, speaker: &mut dyn Speaker) -> Result<ExecutionReport> {
        let start = Instant::now();
        let mut report = ExecutionReport::new(intent.name());
        match intent {
            Intent::Identity => {
                let line = self.config.identity_reply();
                say(speaker, &mut report, &line)?;
            }
            Intent::Creator => {
                let line = self.config.creator_reply();
                say(speaker, &mut report, &line)?;
            }
            Intent::Joke => {
                let line = self.config.joke.clone();
                say(speaker, &mut report, &line)?;
            }
            Intent::Calculate { query } => match self.calculator.query(query)? {
                Some(answer) => say(speaker, &mut report, &format!("The answer is {}", answer))?,
                None => say(
                    speaker,
                    &mut report,
                    "Sorry, I couldn't calculate that.",
                )?,
            },
            Intent::OpenApp(target) => {
                say(speaker, &mut report, target.announcement())?;
                if *target != AppTarget::Unavailable {
                    self.launcher.launch(*target)?;
                    info!(?target, "application launched");
                }
            }
            Intent::Search(request) => self.open_search(request, speaker, &mut report)?,
        }
        report.execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(action = report.action, ms = report.execution_time_ms, "intent executed");
        Ok(report)
    }

    /// Web-search the whole utterance, used when the user accepts the
    /// fallback offer after a failed dispatch.
    pub fn search_fallback(
        &mut self,
        utterance: &Utterance,
        speaker: &mut dyn Speaker,
    ) -> Result<ExecutionReport> {
        let start = Instant::now();
        let mut report = ExecutionReport::new("search_fallback");
        let request = SearchRequest::route(utterance);
        self.open_search(&request, speaker, &mut report)?;
        report.execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(report)
    }

    fn open_search(
        &mut self,
        request: &SearchRequest,
        speaker: &mut dyn Speaker,
        report: &mut ExecutionReport,
    ) -> Result<()> {
        if let Some(line) = request.site.announcement() {
            say(speaker, report, line)?;
        }
        self.search.open(request)?;
        info!(site = ?request.site, query = %request.query_text(), "search opened");
        Ok(())
    }
}

fn say(speaker: &mut dyn Speaker, report: &mut ExecutionReport, line: &str) -> Result<()> {
    speaker.speak(line).map_err(DispatchError::Speech)?;
    report.responses.push(line.to_string());
    Ok(())
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MockCalculator, RecordingLauncher, RecordingSearch, SearchSite};
    use voice_local::MockSpeaker;

    struct Fixture {
        executor: ActionExecutor,
        search: RecordingSearch,
        launcher: RecordingLauncher,
        speaker: MockSpeaker,
    }

    fn fixture(calculator: MockCalculator, launcher: RecordingLauncher) -> Fixture {
        let search = RecordingSearch::default();
        let executor = ActionExecutor::new(
            IntentConfig::default(),
            Box::new(calculator),
            Box::new(search.clone()),
            Box::new(launcher.clone()),
        );
        Fixture {
            executor,
            search,
            launcher,
            speaker: MockSpeaker::new(),
        }
    }

    #[test]
    fn test_canned_replies() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::default());
        let report = f.executor.execute(&Intent::Identity, &mut f.speaker).unwrap();
        assert_eq!(report.action, "identity");
        assert!(f.speaker.spoken()[0].starts_with("Hello, I am Jarvis."));
        f.executor.execute(&Intent::Joke, &mut f.speaker).unwrap();
        assert_eq!(f.speaker.spoken().len(), 2);
    }

    #[test]
    fn test_calculate_answer_and_no_result() {
        let calc = MockCalculator::default().with_answer("2 plus 2", "4");
        let mut f = fixture(calc, RecordingLauncher::default());
        let intent = Intent::Calculate {
            query: "2 plus 2".into(),
        };
        f.executor.execute(&intent, &mut f.speaker).unwrap();
        let unknown = Intent::Calculate {
            query: "the meaning of life".into(),
        };
        f.executor.execute(&unknown, &mut f.speaker).unwrap();
        assert_eq!(
            f.speaker.spoken(),
            vec!["The answer is 4", "Sorry, I couldn't calculate that."]
        );
    }

    #[test]
    fn test_calculator_network_error_propagates() {
        let mut f = fixture(MockCalculator::offline(), RecordingLauncher::default());
        let intent = Intent::Calculate { query: "1+1".into() };
        let err = f.executor.execute(&intent, &mut f.speaker).unwrap_err();
        assert!(matches!(err, DispatchError::Network(_)));
    }

    #[test]
    fn test_search_announces_and_opens() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::default());
        let req = SearchRequest::route(&Utterance::new("search wikipedia einstein"));
        f.executor
            .execute(&Intent::Search(req), &mut f.speaker)
            .unwrap();
        assert_eq!(f.speaker.spoken(), vec!["Opening Wikipedia"]);
        let opened = f.search.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].site, SearchSite::Wikipedia);
        assert_eq!(opened[0].query, vec!["einstein"]);
    }

    #[test]
    fn test_open_unavailable_does_not_launch() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::default());
        f.executor
            .execute(&Intent::OpenApp(AppTarget::Unavailable), &mut f.speaker)
            .unwrap();
        assert!(f.launcher.launched().is_empty());
        assert_eq!(f.speaker.spoken(), vec!["Application not available"]);

        f.executor
            .execute(&Intent::OpenApp(AppTarget::Spreadsheet), &mut f.speaker)
            .unwrap();
        assert_eq!(f.launcher.launched(), vec![AppTarget::Spreadsheet]);
    }

    #[test]
    fn test_launch_failure_is_typed() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::failing());
        let err = f
            .executor
            .execute(&Intent::OpenApp(AppTarget::WordProcessor), &mut f.speaker)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Launch(_)));
    }

    #[test]
    fn test_speech_failure_is_typed() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::default());
        let mut mute = MockSpeaker::failing();
        let err = f.executor.execute(&Intent::Joke, &mut mute).unwrap_err();
        assert!(matches!(err, DispatchError::Speech(_)));
    }

    #[test]
    fn test_search_fallback_uses_whole_utterance() {
        let mut f = fixture(MockCalculator::default(), RecordingLauncher::default());
        f.executor
            .search_fallback(&Utterance::new("calculate the moon"), &mut f.speaker)
            .unwrap();
        let opened = f.search.opened();
        assert_eq!(opened[0].site, SearchSite::Google);
        assert_eq!(opened[0].query_text(), "calculate the moon");
    }
}
