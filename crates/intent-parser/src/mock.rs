use crate::{AppLauncher, AppTarget, Calculator, DispatchError, Result, SearchRequest, WebSearch};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Calculator answering from a fixed table.
#[derive(Debug, Default, Clone)]
pub struct MockCalculator {
    answers: HashMap<String, String>,
    offline: bool,
}

impl MockCalculator {
    pub fn with_answer(mut self, query: impl Into<String>, answer: impl Into<String>) -> Self {
        self.answers.insert(query.into(), answer.into());
        self
    }

    /// Every query fails with a network error.
    pub fn offline() -> Self {
        Self {
            answers: HashMap::new(),
            offline: true,
        }
    }
}

impl Calculator for MockCalculator {
    fn query(&mut self, input: &str) -> Result<Option<String>> {
        if self.offline {
            return Err(DispatchError::Network("calculator offline".into()));
        }
        Ok(self.answers.get(input.trim()).cloned())
    }
}

/// Records opened searches instead of launching a browser.
#[derive(Debug, Default, Clone)]
pub struct RecordingSearch {
    opened: Arc<Mutex<Vec<SearchRequest>>>,
}

impl RecordingSearch {
    pub fn opened(&self) -> Vec<SearchRequest> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl WebSearch for RecordingSearch {
    fn open(&mut self, request: &SearchRequest) -> Result<()> {
        if let Ok(mut v) = self.opened.lock() {
            v.push(request.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<AppTarget>>>,
    fail: bool,
}

impl RecordingLauncher {
    pub fn failing() -> Self {
        Self {
            launched: Arc::default(),
            fail: true,
        }
    }

    pub fn launched(&self) -> Vec<AppTarget> {
        self.launched.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl AppLauncher for RecordingLauncher {
    fn launch(&mut self, target: AppTarget) -> Result<()> {
        if self.fail {
            return Err(DispatchError::Launch(format!("{:?} not installed", target)));
        }
        if let Ok(mut v) = self.launched.lock() {
            v.push(target);
        }
        Ok(())
    }
}
