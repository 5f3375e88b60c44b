use std::collections::HashMap;

/// Sørensen–Dice coefficient over character bigrams, whitespace ignored.
///
/// Returns 1.0 for identical strings and 0.0 for strings sharing no bigram.
/// Symmetric in its arguments. A string shorter than two characters has no
/// bigrams, so it only scores against an identical string.
pub fn dice_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut first: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *first.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = first.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    (2 * shared) as f64 / (a.len() - 1 + b.len() - 1) as f64
}

/// Highest similarity between `word` and any candidate, with 0.0 for no candidates.
pub fn best_match_score<'a, I>(word: &str, candidates: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| dice_similarity(word, candidate))
        .fold(0.0, f64::max)
}
