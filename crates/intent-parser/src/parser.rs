//! Ordered keyword rules for spoken commands

use crate::{AppTarget, Intent, IntentConfig, SearchRequest, Utterance};
use tracing::debug;

/// Action a rule maps to once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Identity,
    Creator,
    Joke,
    Calculate,
    OpenApp,
    Search,
}

/// One entry of the rule table: fires when any trigger is a substring of
/// the normalized utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    pub kind: RuleKind,
}

impl Rule {
    pub fn matches(&self, utterance: &Utterance) -> bool {
        self.triggers.iter().any(|t| utterance.contains(t))
    }

    /// Build the intent for an utterance this rule matched.
    pub fn intent(&self, utterance: &Utterance) -> Intent {
        match self.kind {
            RuleKind::Identity => Intent::Identity,
            RuleKind::Creator => Intent::Creator,
            RuleKind::Joke => Intent::Joke,
            RuleKind::Calculate => Intent::Calculate {
                query: calculation_query(utterance),
            },
            RuleKind::OpenApp => Intent::OpenApp(AppTarget::from_utterance(utterance)),
            RuleKind::Search => Intent::Search(SearchRequest::route(utterance)),
        }
    }
}

fn calculation_query(utterance: &Utterance) -> String {
    match utterance.words_after("calculate") {
        Some(words) => words.join(" "),
        None => utterance
            .normalized()
            .split_once("calculate")
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Evaluated top to bottom; the first match wins.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "identity",
        triggers: &["who are you", "define yourself"],
        kind: RuleKind::Identity,
    },
    Rule {
        name: "creator",
        triggers: &["who made you", "created you"],
        kind: RuleKind::Creator,
    },
    Rule {
        name: "joke",
        triggers: &["crazy"],
        kind: RuleKind::Joke,
    },
    Rule {
        name: "calculate",
        triggers: &["calculate"],
        kind: RuleKind::Calculate,
    },
    Rule {
        name: "open",
        triggers: &["open"],
        kind: RuleKind::OpenApp,
    },
    Rule {
        name: "search",
        triggers: &["search", "play"],
        kind: RuleKind::Search,
    },
];

/// Result of classifying an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub intent: Intent,
    /// Name of the rule that fired
    pub rule: &'static str,
    pub text: String,
}

/// Keyword classifier over a fixed rule table.
#[derive(Debug, Clone)]
pub struct IntentParser {
    config: IntentConfig,
    rules: Vec<Rule>,
}

impl IntentParser {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            config,
            rules: DEFAULT_RULES.to_vec(),
        }
    }

    /// True when any configured exit phrase is a substring of the utterance.
    pub fn is_exit(&self, utterance: &Utterance) -> bool {
        self.config
            .exit_phrases
            .iter()
            .any(|p| utterance.contains(p))
    }

    pub fn is_affirmative(&self, utterance: &Utterance) -> bool {
        self.config
            .affirmatives
            .iter()
            .any(|p| utterance.contains(p))
    }

    pub fn match_rule(&self, utterance: &Utterance) -> Option<&Rule> {
        if utterance.is_empty() {
            return None;
        }
        self.rules.iter().find(|r| r.matches(utterance))
    }

    /// Classify an utterance. `None` means no rule matched.
    pub fn classify(&self, utterance: &Utterance) -> Option<ParseResult> {
        let rule = self.match_rule(utterance)?;
        let intent = rule.intent(utterance);
        debug!(rule = rule.name, ?intent, "classified utterance");
        Some(ParseResult {
            intent,
            rule: rule.name,
            text: utterance.original().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchSite;

    fn parser() -> IntentParser {
        IntentParser::new(IntentConfig::default())
    }

    fn classify(text: &str) -> Option<Intent> {
        parser().classify(&Utterance::new(text)).map(|r| r.intent)
    }

    #[test]
    fn test_each_rule_independently() {
        let cases = [
            ("identity", "who are you"),
            ("identity", "please define yourself"),
            ("creator", "who made you"),
            ("creator", "who created you"),
            ("joke", "are you crazy"),
            ("calculate", "calculate 7 times 6"),
            ("open", "open excel"),
            ("search", "search cats"),
            ("search", "play some music"),
        ];
        for (name, text) in cases {
            let rule = DEFAULT_RULES
                .iter()
                .find(|r| r.name == name)
                .unwrap();
            assert!(rule.matches(&Utterance::new(text)), "{name} vs {text}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify("who are you, calculate 2+2"), Some(Intent::Identity));
        let result = parser()
            .classify(&Utterance::new("Who are you, calculate 2+2"))
            .unwrap();
        assert_eq!(result.rule, "identity");
        assert_eq!(result.text, "Who are you, calculate 2+2");
    }

    #[test]
    fn test_calculate_query() {
        assert_eq!(
            classify("Calculate 2 plus 2"),
            Some(Intent::Calculate {
                query: "2 plus 2".into()
            })
        );
        assert_eq!(
            classify("recalculate 9"),
            Some(Intent::Calculate { query: "9".into() })
        );
    }

    #[test]
    fn test_search_wikipedia_einstein() {
        match classify("search wikipedia einstein") {
            Some(Intent::Search(req)) => {
                assert_eq!(req.site, SearchSite::Wikipedia);
                assert_eq!(req.query_text(), "einstein");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_open_targets() {
        assert_eq!(
            classify("open google"),
            Some(Intent::OpenApp(AppTarget::Browser))
        );
        assert_eq!(
            classify("open notepad"),
            Some(Intent::OpenApp(AppTarget::Unavailable))
        );
    }

    #[test]
    fn test_no_match_and_empty() {
        assert_eq!(classify("what a lovely day"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_exit_phrases_are_literal_substrings() {
        let p = parser();
        assert!(p.is_exit(&Utterance::new("Let's go now")));
        assert!(p.is_exit(&Utterance::new("Good BYE")));
        assert!(p.is_exit(&Utterance::new("time to sleep")));
        assert!(!p.is_exit(&Utterance::new("going")));
        assert!(!p.is_exit(&Utterance::new("let's go")));
    }

    #[test]
    fn test_affirmatives() {
        let p = parser();
        assert!(p.is_affirmative(&Utterance::new("Yes please")));
        assert!(p.is_affirmative(&Utterance::new("yeah")));
        assert!(!p.is_affirmative(&Utterance::new("no thanks")));
    }
}
