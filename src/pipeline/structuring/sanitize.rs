// Sanitize report text before it is embedded in the extraction prompt.
// Strips invisible Unicode and prompt-injection lines, normalizes whitespace, truncates.
// The guardrail never sees this output; it checks the original source text.

/// Maximum input length to send to the extraction service (bytes).
pub const MAX_INPUT_LENGTH: usize = 50_000;

const TRUNCATION_MARKER: &str = "…[TRUNCATED]";

/// Sanitize text for the extraction prompt. When injection lines are
/// removed, logs their count (never the content).
pub fn sanitize_for_llm(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let (no_injection, removed) = remove_injection_lines(&cleaned);

    if removed > 0 {
        tracing::warn!(
            removed_lines = removed,
            "Injection patterns detected and removed from report input"
        );
    }

    let normalized = normalize_whitespace(&no_injection);
    truncate_to_max_length(&normalized, MAX_INPUT_LENGTH)
}

/// Remove zero-width, bidi and control characters. Keeps space, tab, CR, LF.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

fn is_role_marker(lower: &str) -> bool {
    const MARKERS: &[&str] = &[
        "system:",
        "assistant:",
        "user:",
        "[system]",
        "[assistant]",
        "[inst]",
        "[/inst]",
        "<<sys>>",
        "note to ai:",
        "instructions:",
        "<instruction",
        "</instruction",
        "<system",
        "</system",
    ];
    MARKERS.iter().any(|m| lower.starts_with(m))
}

fn is_override_attempt(lower: &str) -> bool {
    const PHRASES: &[&str] = &[
        "ignore previous instructions",
        "ignore all instructions",
        "ignore the above instructions",
        "disregard your instructions",
        "disregard all instructions",
        "forget your instructions",
        "new instructions:",
        "please also add",
    ];
    PHRASES.iter().any(|p| lower.contains(p))
}

fn remove_injection_lines(text: &str) -> (String, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0usize;

    for line in text.lines() {
        let lower = line.trim().to_lowercase();
        if is_role_marker(&lower) || is_override_attempt(&lower) {
            removed += 1;
        } else {
            kept.push(line);
        }
    }

    (kept.join("\n"), removed)
}

/// Trim each line and collapse runs of blank lines to one.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_blank {
                lines.push("");
            }
            prev_blank = true;
        } else {
            lines.push(trimmed);
            prev_blank = false;
        }
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Truncate to at most `max_len` bytes, breaking at a word boundary when possible.
fn truncate_to_max_length(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];
    let end = truncated
        .rfind(char::is_whitespace)
        .unwrap_or(truncated.len());

    format!("{}{TRUNCATION_MARKER}", &text[..end])
}
