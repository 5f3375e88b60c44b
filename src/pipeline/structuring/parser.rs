use serde_json::{Map, Value};

use super::types::{ExtractionOutcome, FailureKind, OrNa, RefRange, TestRecord, TestStatus, NA};
use crate::config::DIAGNOSTIC_EXCERPT_CHARS;

const DEFAULT_UNPROCESSED_REASON: &str = "The report could not be processed safely.";

/// Normalize the extraction service's raw response into an outcome.
///
/// - blank response → `error`
/// - not JSON → `error` with a bounded excerpt in `debug`
/// - no `status` → `error`
/// - `unprocessed` → passed through with its reason
/// - `ok` without a `tests` array, or with an unusable entry → `error`
pub fn parse_extraction_response(raw: &str) -> ExtractionOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ExtractionOutcome::error(
            FailureKind::Collaborator,
            "No text returned from the extraction model.",
        );
    }

    let value: Value = match serde_json::from_str(strip_code_fence(trimmed)) {
        Ok(v) => v,
        Err(e) => {
            let excerpt = diagnostic_excerpt(trimmed);
            tracing::debug!(error = %e, excerpt = %excerpt, "Extraction response is not JSON");
            tracing::warn!(response_len = trimmed.len(), "Invalid JSON returned by extraction model");
            return ExtractionOutcome::Error {
                reason: "Invalid JSON returned by the extraction model.".into(),
                debug: Some(excerpt),
                kind: FailureKind::InvalidJson,
            };
        }
    };

    let Some(obj) = value.as_object() else {
        return schema_violation("Invalid response: expected a JSON object.");
    };

    let Some(status) = obj.get("status").and_then(Value::as_str) else {
        return schema_violation("Invalid response: missing status field.");
    };

    match status.trim().to_ascii_lowercase().as_str() {
        "unprocessed" => {
            let reason = obj
                .get("reason")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_UNPROCESSED_REASON);
            ExtractionOutcome::unprocessed(reason)
        }
        "ok" => parse_ok_payload(obj),
        other => schema_violation(format!("Invalid response: unknown status {other:?}.")),
    }
}

fn schema_violation(reason: impl Into<String>) -> ExtractionOutcome {
    ExtractionOutcome::error(FailureKind::SchemaViolation, reason)
}

fn parse_ok_payload(obj: &Map<String, Value>) -> ExtractionOutcome {
    let Some(items) = obj.get("tests").and_then(Value::as_array) else {
        return schema_violation("Invalid response: tests array missing or invalid.");
    };

    let mut tests = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_test_record(item) {
            Some(record) => tests.push(record),
            None => {
                return schema_violation(format!(
                    "Invalid response: test entry {} has no usable name.",
                    index + 1
                ))
            }
        }
    }

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    ExtractionOutcome::Ok { tests, summary }
}

/// A record needs an object with a non-blank `name`. Every other field
/// degrades to `"NA"` when missing, null, or unusable.
fn parse_test_record(item: &Value) -> Option<TestRecord> {
    let obj = item.as_object()?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty() && !is_na(n))?;

    Some(TestRecord {
        name: name.to_string(),
        value: parse_number(obj.get("value")).into(),
        unit: parse_unit(obj.get("unit")).into(),
        status: parse_status(obj.get("status")).into(),
        ref_range: parse_ref_range(obj.get("ref_range")),
    })
}

fn is_na(s: &str) -> bool {
    s.eq_ignore_ascii_case(NA) || s.eq_ignore_ascii_case("n/a")
}

fn parse_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_unit(value: Option<&Value>) -> Option<String> {
    value?
        .as_str()
        .map(str::trim)
        .filter(|u| !u.is_empty() && !is_na(u))
        .map(str::to_string)
}

fn parse_status(value: Option<&Value>) -> Option<TestStatus> {
    match value?.as_str()?.trim().to_ascii_lowercase().as_str() {
        "low" => Some(TestStatus::Low),
        "high" => Some(TestStatus::High),
        "normal" => Some(TestStatus::Normal),
        _ => None,
    }
}

fn parse_ref_range(value: Option<&Value>) -> OrNa<RefRange> {
    let Some(obj) = value.and_then(Value::as_object) else {
        return OrNa::Na;
    };
    match (parse_number(obj.get("low")), parse_number(obj.get("high"))) {
        (Some(low), Some(high)) => OrNa::Known(RefRange { low, high }),
        _ => OrNa::Na,
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// First `DIAGNOSTIC_EXCERPT_CHARS` characters of the response.
pub fn diagnostic_excerpt(text: &str) -> String {
    text.chars().take(DIAGNOSTIC_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ok() -> &'static str {
        r#"{
            "status": "ok",
            "tests": [
                {
                    "name": "Hemoglobin",
                    "value": 13.5,
                    "unit": "g/dL",
                    "status": "normal",
                    "ref_range": {"low": 13, "high": 17}
                },
                {
                    "name": "WBC",
                    "value": "NA",
                    "unit": "NA",
                    "status": "NA",
                    "ref_range": "NA"
                }
            ],
            "summary": "Your hemoglobin is within the normal range."
        }"#
    }

    #[test]
    fn parses_ok_payload() {
        let ExtractionOutcome::Ok { tests, summary } = parse_extraction_response(sample_ok()) else {
            panic!("expected ok");
        };
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].name, "Hemoglobin");
        assert_eq!(tests[0].value, OrNa::Known(13.5));
        assert_eq!(tests[0].unit, OrNa::Known("g/dL".to_string()));
        assert_eq!(tests[0].status, OrNa::Known(TestStatus::Normal));
        assert_eq!(
            tests[0].ref_range,
            OrNa::Known(RefRange {
                low: 13.0,
                high: 17.0
            })
        );
        assert_eq!(tests[1], TestRecord::named("WBC"));
        assert!(summary.contains("hemoglobin"));
    }

    #[test]
    fn unprocessed_passes_through() {
        let outcome =
            parse_extraction_response(r#"{"status": "unprocessed", "reason": "invalid unit for test"}"#);
        assert_eq!(outcome, ExtractionOutcome::unprocessed("invalid unit for test"));
    }

    #[test]
    fn unprocessed_without_reason_gets_default() {
        let outcome = parse_extraction_response(r#"{"status": "unprocessed"}"#);
        assert_eq!(outcome, ExtractionOutcome::unprocessed(DEFAULT_UNPROCESSED_REASON));
    }

    #[test]
    fn non_json_is_error_with_bounded_excerpt() {
        let raw = format!("Sure! Here are your results: {}", "x".repeat(500));
        let ExtractionOutcome::Error { debug, kind, reason } = parse_extraction_response(&raw) else {
            panic!("expected error");
        };
        assert_eq!(kind, FailureKind::InvalidJson);
        assert!(reason.contains("Invalid JSON"));
        let debug = debug.unwrap();
        assert_eq!(debug.chars().count(), DIAGNOSTIC_EXCERPT_CHARS);
        assert!(debug.starts_with("Sure! Here are"));
    }

    #[test]
    fn excerpt_counts_chars_not_bytes() {
        let text = "é".repeat(300);
        assert_eq!(diagnostic_excerpt(&text).chars().count(), 200);
    }

    #[test]
    fn blank_response_is_error() {
        let outcome = parse_extraction_response("   \n");
        assert!(matches!(
            outcome,
            ExtractionOutcome::Error { kind: FailureKind::Collaborator, .. }
        ));
    }

    #[test]
    fn missing_status_is_schema_violation() {
        let outcome = parse_extraction_response(r#"{"tests": [], "summary": ""}"#);
        let ExtractionOutcome::Error { kind, reason, .. } = outcome else {
            panic!("expected error");
        };
        assert_eq!(kind, FailureKind::SchemaViolation);
        assert!(reason.contains("missing status"));
    }

    #[test]
    fn ok_without_tests_array_is_schema_violation() {
        for raw in [
            r#"{"status": "ok", "summary": "x"}"#,
            r#"{"status": "ok", "tests": "Hemoglobin", "summary": "x"}"#,
        ] {
            let outcome = parse_extraction_response(raw);
            assert!(
                matches!(outcome, ExtractionOutcome::Error { kind: FailureKind::SchemaViolation, .. }),
                "{raw} -> {outcome:?}"
            );
        }
    }

    #[test]
    fn unknown_status_is_schema_violation() {
        let outcome = parse_extraction_response(r#"{"status": "maybe"}"#);
        assert!(matches!(
            outcome,
            ExtractionOutcome::Error { kind: FailureKind::SchemaViolation, .. }
        ));
    }

    #[test]
    fn array_root_is_schema_violation() {
        let outcome = parse_extraction_response("[1, 2, 3]");
        assert!(matches!(
            outcome,
            ExtractionOutcome::Error { kind: FailureKind::SchemaViolation, .. }
        ));
    }

    #[test]
    fn nameless_entry_is_schema_violation() {
        let raw = r#"{"status": "ok", "tests": [{"name": "Hemoglobin"}, {"name": "  ", "value": 4}], "summary": ""}"#;
        let ExtractionOutcome::Error { reason, .. } = parse_extraction_response(raw) else {
            panic!("expected error");
        };
        assert!(reason.contains("entry 2"));
    }

    #[test]
    fn nulls_and_missing_fields_degrade_to_na() {
        let raw = r#"{"status": "ok", "tests": [{"name": "Glucose", "value": null, "unit": "", "status": "elevated", "ref_range": {"low": 70}}], "summary": "s"}"#;
        let ExtractionOutcome::Ok { tests, .. } = parse_extraction_response(raw) else {
            panic!("expected ok");
        };
        assert_eq!(tests[0], TestRecord::named("Glucose"));
    }

    #[test]
    fn numeric_strings_and_case_are_normalized() {
        let raw = r#"{"status": "OK", "tests": [{"name": "Glucose", "value": "105", "unit": " mg/dL ", "status": "HIGH", "ref_range": {"low": "70", "high": 99}}], "summary": "s"}"#;
        let ExtractionOutcome::Ok { tests, .. } = parse_extraction_response(raw) else {
            panic!("expected ok");
        };
        assert_eq!(tests[0].value, OrNa::Known(105.0));
        assert_eq!(tests[0].unit, OrNa::Known("mg/dL".to_string()));
        assert_eq!(tests[0].status, OrNa::Known(TestStatus::High));
        assert_eq!(
            tests[0].ref_range,
            OrNa::Known(RefRange {
                low: 70.0,
                high: 99.0
            })
        );
    }

    #[test]
    fn missing_summary_defaults_to_empty() {
        let ExtractionOutcome::Ok { summary, .. } =
            parse_extraction_response(r#"{"status": "ok", "tests": []}"#)
        else {
            panic!("expected ok");
        };
        assert!(summary.is_empty());
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = format!("```json\n{}\n```", sample_ok());
        assert!(parse_extraction_response(&raw).is_ok());
    }
}
