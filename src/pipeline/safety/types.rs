use serde::Serialize;

/// How a claimed test name was matched against the source text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameSupport {
    /// The whole name occurs in the source text (case-insensitive).
    Substring,
    /// Every word of the name occurs in the word set or is a close fuzzy match.
    Words { weakest_score: f64 },
    /// At least one word has no acceptable match.
    Unsupported { word: String, best_score: f64 },
}

impl NameSupport {
    pub fn is_supported(&self) -> bool {
        !matches!(self, NameSupport::Unsupported { .. })
    }
}

/// Reason attached to an `unprocessed` outcome when a test name is rejected.
pub fn hallucination_reason(test_name: &str) -> String {
    format!("hallucinated test not present in input: {test_name}")
}
