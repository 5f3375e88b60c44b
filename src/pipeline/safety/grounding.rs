use std::collections::HashSet;

use super::similarity::best_match_score;
use super::types::{hallucination_reason, NameSupport};
use crate::config::FUZZY_MATCH_THRESHOLD;
use crate::pipeline::extraction::SourceText;
use crate::pipeline::structuring::{ExtractionOutcome, TestRecord};

/// Lower-cased words of the source text, split on every non-alphanumeric
/// character. Empty tokens are dropped.
pub fn ocr_word_set(source_lower: &str) -> HashSet<&str> {
    source_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Decide whether one claimed test name is supported by the source text.
///
/// `source_lower` and `words` must come from the same lower-cased source.
pub fn check_test_name(name: &str, source_lower: &str, words: &HashSet<&str>) -> NameSupport {
    let name_lower = name.to_lowercase();
    if source_lower.contains(&name_lower) {
        return NameSupport::Substring;
    }

    let mut weakest_score = 1.0_f64;
    for word in name_lower.split_whitespace() {
        if words.contains(word) {
            continue;
        }
        let best_score = best_match_score(word, words.iter().copied());
        if best_score < FUZZY_MATCH_THRESHOLD {
            return NameSupport::Unsupported {
                word: word.to_string(),
                best_score,
            };
        }
        weakest_score = weakest_score.min(best_score);
    }

    NameSupport::Words { weakest_score }
}

/// Rejection reason for the first test whose name the source does not
/// support, in array order. `None` when every name is grounded.
pub fn find_hallucinated_test(source: &SourceText, tests: &[TestRecord]) -> Option<String> {
    let source_lower = source.as_str().to_lowercase();
    let words = ocr_word_set(&source_lower);

    for (index, test) in tests.iter().enumerate() {
        match check_test_name(&test.name, &source_lower, &words) {
            NameSupport::Unsupported { word, best_score } => {
                tracing::warn!(
                    test_name = %test.name,
                    index,
                    word = %word,
                    best_score,
                    "Guardrail rejected extracted test"
                );
                return Some(hallucination_reason(&test.name));
            }
            NameSupport::Words { weakest_score } => {
                tracing::debug!(test_name = %test.name, weakest_score, "Test name matched by words");
            }
            NameSupport::Substring => {}
        }
    }

    tracing::info!(test_count = tests.len(), "Guardrail passed");
    None
}

/// Re-validate every extracted test name against the source text.
///
/// Only `ok` outcomes are inspected; anything else is returned as-is.
/// The first unsupported name demotes the outcome to `unprocessed`;
/// later records are not evaluated.
pub fn check_test_names(source: &SourceText, outcome: ExtractionOutcome) -> ExtractionOutcome {
    match outcome {
        ExtractionOutcome::Ok { tests, summary } => match find_hallucinated_test(source, &tests) {
            Some(reason) => ExtractionOutcome::Unprocessed { reason },
            None => ExtractionOutcome::Ok { tests, summary },
        },
        other => other,
    }
}
