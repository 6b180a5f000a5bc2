//! Classified commands and their parameters

use crate::Utterance;
use serde::{Deserialize, Serialize};

/// A command recognised in an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// "who are you"
    Identity,
    /// "who created you"
    Creator,
    Joke,
    /// Arithmetic or factual query for the calculator service.
    Calculate { query: String },
    OpenApp(AppTarget),
    Search(SearchRequest),
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Identity => "identity",
            Intent::Creator => "creator",
            Intent::Joke => "joke",
            Intent::Calculate { .. } => "calculate",
            Intent::OpenApp(_) => "open_app",
            Intent::Search(_) => "search",
        }
    }
}

/// Application named in an "open ..." command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppTarget {
    Browser,
    WordProcessor,
    Spreadsheet,
    /// Nothing recognisable was named.
    Unavailable,
}

impl AppTarget {
    /// First match wins: google, word, excel.
    pub fn from_utterance(utterance: &Utterance) -> Self {
        if utterance.contains("google") {
            AppTarget::Browser
        } else if utterance.contains("word") {
            AppTarget::WordProcessor
        } else if utterance.contains("excel") {
            AppTarget::Spreadsheet
        } else {
            AppTarget::Unavailable
        }
    }

    /// Spoken before launching.
    pub fn announcement(self) -> &'static str {
        match self {
            AppTarget::Browser => "Opening Google Chrome",
            AppTarget::WordProcessor => "Opening Microsoft Word",
            AppTarget::Spreadsheet => "Opening Microsoft Excel",
            AppTarget::Unavailable => "Application not available",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSite {
    YouTube,
    Wikipedia,
    Google,
}

impl SearchSite {
    pub fn announcement(self) -> Option<&'static str> {
        match self {
            SearchSite::YouTube => Some("Opening in youtube"),
            SearchSite::Wikipedia => Some("Opening Wikipedia"),
            SearchSite::Google => None,
        }
    }
}

/// A web search routed to a site, with the query words that follow the
/// site's trigger word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub site: SearchSite,
    pub query: Vec<String>,
}

impl SearchRequest {
    pub fn new(site: SearchSite, query: Vec<String>) -> Self {
        Self { site, query }
    }

    /// Route an utterance: youtube, then wikipedia, then google, then a
    /// generic "search", otherwise the whole utterance goes to Google.
    pub fn route(utterance: &Utterance) -> Self {
        for (trigger, site) in [
            ("youtube", SearchSite::YouTube),
            ("wikipedia", SearchSite::Wikipedia),
            ("google", SearchSite::Google),
            ("search", SearchSite::Google),
        ] {
            if utterance.contains(trigger) {
                return Self::new(site, utterance.query_after(trigger));
            }
        }
        let words = utterance.words().into_iter().map(str::to_string).collect();
        Self::new(SearchSite::Google, words)
    }

    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }

    pub fn url(&self) -> String {
        let (base, sep) = match self.site {
            SearchSite::YouTube => ("http://www.youtube.com/results?search_query=", "+"),
            SearchSite::Wikipedia => ("https://en.wikipedia.org/wiki/", "_"),
            SearchSite::Google => ("https://www.google.com/search?q=", "+"),
        };
        let encoded: Vec<String> = self
            .query
            .iter()
            .map(|w| urlencoding::encode(w).into_owned())
            .collect();
        format!("{}{}", base, encoded.join(sep))
    }
}
