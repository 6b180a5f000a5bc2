//! Transcribed user input

/// One transcribed turn. An empty utterance means recognition failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance {
    original: String,
    normalized: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        let original = text.into().trim().to_string();
        let normalized = original.to_lowercase();
        Self {
            original,
            normalized,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Lowercased transcript used for all matching.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Case-insensitive substring test.
    pub fn contains(&self, needle: &str) -> bool {
        self.normalized.contains(&needle.to_lowercase())
    }

    pub fn words(&self) -> Vec<&str> {
        self.normalized.split_whitespace().collect()
    }

    /// Words following the first standalone occurrence of `keyword`.
    /// Punctuation around a word does not prevent a match.
    pub fn words_after(&self, keyword: &str) -> Option<Vec<&str>> {
        let keyword = keyword.to_lowercase();
        let words = self.words();
        words
            .iter()
            .position(|w| bare(w) == keyword)
            .map(|idx| words[idx + 1..].to_vec())
    }

    /// Query words for a routed search: the words after a standalone
    /// `keyword`, or every word when the keyword only appears inside a
    /// longer word ("youtube's").
    pub fn query_after(&self, keyword: &str) -> Vec<String> {
        let words = self
            .words_after(keyword)
            .unwrap_or_else(|| self.words());
        words.into_iter().map(str::to_string).collect()
    }
}

fn bare(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}
