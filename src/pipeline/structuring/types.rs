use serde::{Serialize, Serializer};

use super::StructuringError;

/// Sentinel used on the wire for "value intentionally unknown".
pub const NA: &str = "NA";

/// A field that is either a known value or the `"NA"` sentinel.
///
/// Serializes as the inner value or as the string `"NA"`, never `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrNa<T> {
    Known(T),
    Na,
}

impl<T> OrNa<T> {
    pub fn is_na(&self) -> bool {
        matches!(self, OrNa::Na)
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            OrNa::Known(v) => Some(v),
            OrNa::Na => None,
        }
    }
}

impl<T> From<Option<T>> for OrNa<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(OrNa::Na, OrNa::Known)
    }
}

impl<T: Serialize> Serialize for OrNa<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OrNa::Known(v) => v.serialize(serializer),
            OrNa::Na => serializer.serialize_str(NA),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Low,
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefRange {
    pub low: f64,
    pub high: f64,
}

/// One lab test as extracted from the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub name: String,
    pub value: OrNa<f64>,
    pub unit: OrNa<String>,
    pub status: OrNa<TestStatus>,
    pub ref_range: OrNa<RefRange>,
}

impl TestRecord {
    /// A record with only a name; every other field is `"NA"`.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: OrNa::Na,
            unit: OrNa::Na,
            status: OrNa::Na,
            ref_range: OrNa::Na,
        }
    }
}

/// Why an `error` outcome was produced. Not part of the wire format;
/// the orchestrator uses it to pick the error kind and HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport or service failure.
    Collaborator,
    /// The service did not answer within the configured timeout.
    Timeout,
    /// The response was not JSON.
    InvalidJson,
    /// The response parsed but did not have the required shape.
    SchemaViolation,
}

/// The tagged result threaded through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionOutcome {
    Ok {
        tests: Vec<TestRecord>,
        summary: String,
    },
    Unprocessed {
        reason: String,
    },
    Error {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        debug: Option<String>,
        #[serde(skip)]
        kind: FailureKind,
    },
}

impl ExtractionOutcome {
    pub fn unprocessed(reason: impl Into<String>) -> Self {
        ExtractionOutcome::Unprocessed {
            reason: reason.into(),
        }
    }

    pub fn error(kind: FailureKind, reason: impl Into<String>) -> Self {
        ExtractionOutcome::Error {
            reason: reason.into(),
            debug: None,
            kind,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExtractionOutcome::Ok { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            ExtractionOutcome::Ok { .. } => "ok",
            ExtractionOutcome::Unprocessed { .. } => "unprocessed",
            ExtractionOutcome::Error { .. } => "error",
        }
    }
}

/// Structured-extraction service abstraction (allows mocking).
///
/// Returns the raw response text; parsing happens in `parser`.
pub trait LlmClient {
    fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String, StructuringError>;
}
