//! Report processing orchestrator.
//!
//! Single entry point that drives the full pipeline:
//! resolve text → extract tests → guardrail → caller-facing outcome.
//!
//! Uses trait-based DI for both collaborators (OcrEngine, LlmClient)
//! so the orchestrator stays testable with mock implementations.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{ExtractionBackend, ServiceConfig};
use crate::pipeline::extraction::{
    resolve_source_text, ExtractionError, OcrEngine, OcrServiceClient, ReportInput, SourceText,
};
use crate::pipeline::safety::find_hallucinated_test;
use crate::pipeline::structuring::{
    ExtractionOutcome, FailureKind, GeminiClient, LlmClient, OllamaClient, ReportStructurer,
    StructuringError, TestRecord,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Terminal failures of the pipeline. `Unprocessed` is not an error; it is a
/// `ReportOutcome`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Missing input. Please upload a file (key: 'report_file') or provide text (key: 'report_text').")]
    MissingInput,

    #[error("No readable text found in the report. Please upload a clearer file or paste the report text.")]
    EmptyInput,

    #[error("Low OCR confidence ({confidence:.0}). Please upload a clearer file/image.")]
    LowConfidence { confidence: f32 },

    #[error("{message}")]
    Collaborator {
        message: String,
        debug: Option<String>,
    },

    #[error("{0}")]
    CollaboratorTimeout(String),

    #[error("{0}")]
    SchemaViolation(String),

    #[error("Failed to initialize collaborator client: {0}")]
    ClientInit(String),
}

impl ProcessingError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessingError::MissingInput => "MISSING_INPUT",
            ProcessingError::EmptyInput => "EMPTY_INPUT",
            ProcessingError::LowConfidence { .. } => "LOW_CONFIDENCE",
            ProcessingError::Collaborator { .. } => "COLLABORATOR_ERROR",
            ProcessingError::CollaboratorTimeout(_) => "COLLABORATOR_TIMEOUT",
            ProcessingError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            ProcessingError::ClientInit(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can fix this by sending a different request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::MissingInput
                | ProcessingError::EmptyInput
                | ProcessingError::LowConfidence { .. }
        )
    }

    pub fn debug(&self) -> Option<&str> {
        match self {
            ProcessingError::Collaborator { debug, .. } => debug.as_deref(),
            _ => None,
        }
    }
}

impl From<ExtractionError> for ProcessingError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::MissingInput => ProcessingError::MissingInput,
            ExtractionError::LowConfidence { confidence } => {
                ProcessingError::LowConfidence { confidence }
            }
            ExtractionError::OcrTimeout(secs) => ProcessingError::CollaboratorTimeout(format!(
                "Text recognition timed out after {secs}s. Please try again later."
            )),
            other => ProcessingError::Collaborator {
                message: format!("Failed to extract text from the image file ({other})."),
                debug: None,
            },
        }
    }
}

impl From<StructuringError> for ProcessingError {
    fn from(err: StructuringError) -> Self {
        ProcessingError::ClientInit(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Successful end of the pipeline: either validated tests or a safe refusal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReportOutcome {
    Ok {
        tests: Vec<TestRecord>,
        summary: String,
    },
    Unprocessed {
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Orchestrates report processing: resolve → extract → guardrail.
///
/// Stateless per request; blocking (call from `spawn_blocking` in async code).
pub struct ReportProcessor {
    ocr: Arc<dyn OcrEngine + Send + Sync>,
    structurer: ReportStructurer,
    ocr_language: String,
}

impl ReportProcessor {
    pub fn new(
        ocr: Arc<dyn OcrEngine + Send + Sync>,
        structurer: ReportStructurer,
        ocr_language: &str,
    ) -> Self {
        Self {
            ocr,
            structurer,
            ocr_language: ocr_language.to_string(),
        }
    }

    pub fn run(&self, input: &ReportInput) -> Result<ReportOutcome, ProcessingError> {
        let resolved = resolve_source_text(input, self.ocr.as_ref(), &self.ocr_language)?;
        let origin = resolved.origin;

        let source = SourceText::new(resolved.text).ok_or_else(|| {
            tracing::warn!(origin = ?origin, "Resolved report text is blank");
            ProcessingError::EmptyInput
        })?;

        match self.structurer.extract(&source) {
            ExtractionOutcome::Ok { tests, summary } => {
                match find_hallucinated_test(&source, &tests) {
                    Some(reason) => {
                        tracing::info!(origin = ?origin, "Report left unprocessed by guardrail");
                        Ok(ReportOutcome::Unprocessed { reason })
                    }
                    None => {
                        tracing::info!(origin = ?origin, test_count = tests.len(), "Report processed");
                        Ok(ReportOutcome::Ok { tests, summary })
                    }
                }
            }
            ExtractionOutcome::Unprocessed { reason } => {
                tracing::info!(origin = ?origin, "Report left unprocessed");
                Ok(ReportOutcome::Unprocessed { reason })
            }
            ExtractionOutcome::Error {
                reason,
                debug,
                kind,
            } => Err(error_for_failure(kind, reason, debug)),
        }
    }
}

fn error_for_failure(kind: FailureKind, reason: String, debug: Option<String>) -> ProcessingError {
    match kind {
        FailureKind::Timeout => ProcessingError::CollaboratorTimeout(reason),
        FailureKind::SchemaViolation => ProcessingError::SchemaViolation(reason),
        FailureKind::Collaborator | FailureKind::InvalidJson => ProcessingError::Collaborator {
            message: reason,
            debug,
        },
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build a `ReportProcessor` with the production collaborator clients
/// selected by `config`.
pub fn build_processor(config: &ServiceConfig) -> Result<ReportProcessor, ProcessingError> {
    let ocr = OcrServiceClient::new(&config.ocr_url, config.ocr_timeout)
        .map_err(|e| ProcessingError::ClientInit(e.to_string()))?;

    let llm: Arc<dyn LlmClient + Send + Sync> = match &config.backend {
        ExtractionBackend::Gemini { api_key, base_url } => Arc::new(GeminiClient::new(
            base_url,
            api_key,
            config.extraction_timeout,
        )?),
        ExtractionBackend::Ollama { base_url } => {
            Arc::new(OllamaClient::new(base_url, config.extraction_timeout)?)
        }
    };

    tracing::info!(
        backend = config.backend.name(),
        model = %config.extraction_model,
        ocr_url = %config.ocr_url,
        "Report processor configured"
    );

    let structurer = ReportStructurer::new(llm, &config.extraction_model);
    Ok(ReportProcessor::new(
        Arc::new(ocr),
        structurer,
        &config.ocr_language,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockOcrEngine;
    use crate::pipeline::structuring::{MockLlmClient, MockReply};

    const REPORT: &str = "Hemoglobin 13.5 g/dL (13-17)";

    fn hemoglobin_response() -> String {
        r#"{
  "status": "ok",
  "tests": [
    {
      "name": "Hemoglobin",
      "value": 13.5,
      "unit": "g/dL",
      "status": "normal",
      "ref_range": {"low": 13, "high": 17}
    }
  ],
  "summary": "Your hemoglobin is within the normal range."
}"#
        .to_string()
    }

    fn build_test_processor(
        ocr: Arc<MockOcrEngine>,
        llm: Arc<MockLlmClient>,
    ) -> ReportProcessor {
        ReportProcessor::new(ocr, ReportStructurer::new(llm, "test-model"), "eng")
    }

    // -- Tests -------------------------------------------------------------

    #[test]
    fn raw_text_full_pipeline() {
        let ocr = Arc::new(MockOcrEngine::new("unused", 99.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr.clone(), llm.clone());

        let outcome = processor.run(&ReportInput::from_text(REPORT)).unwrap();

        let ReportOutcome::Ok { tests, summary } = outcome else {
            panic!("expected ok");
        };
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "Hemoglobin");
        assert!(summary.contains("normal range"));
        assert_eq!(ocr.calls(), 0);
        assert_eq!(llm.calls(), 1);
    }

    #[test]
    fn image_full_pipeline() {
        let ocr = Arc::new(MockOcrEngine::new(REPORT, 88.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr.clone(), llm.clone());

        let outcome = processor.run(&ReportInput::from_file(vec![0x89, 0x50, 0x4E, 0x47])).unwrap();

        assert!(matches!(outcome, ReportOutcome::Ok { .. }));
        assert_eq!(ocr.calls(), 1);
        assert!(llm.last_prompt().unwrap().contains(REPORT));
    }

    #[test]
    fn low_confidence_stops_before_extraction() {
        let ocr = Arc::new(MockOcrEngine::new(REPORT, 45.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr, llm.clone());

        let err = processor.run(&ReportInput::from_file(vec![1, 2, 3])).unwrap_err();

        assert!(matches!(err, ProcessingError::LowConfidence { confidence } if confidence == 45.0));
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Low OCR confidence"));
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn threshold_confidence_proceeds() {
        let ocr = Arc::new(MockOcrEngine::new(REPORT, 60.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr, llm.clone());

        assert!(processor.run(&ReportInput::from_file(vec![1])).is_ok());
        assert_eq!(llm.calls(), 1);
    }

    #[test]
    fn empty_file_falls_back_to_text() {
        let ocr = Arc::new(MockOcrEngine::new("from image", 99.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr.clone(), llm.clone());

        let input = ReportInput {
            file: Some(Vec::new()),
            text: Some(REPORT.to_string()),
        };
        let outcome = processor.run(&input).unwrap();

        assert!(matches!(outcome, ReportOutcome::Ok { .. }));
        assert_eq!(ocr.calls(), 0);
        assert!(llm.last_prompt().unwrap().contains(REPORT));
    }

    #[test]
    fn no_input_is_missing_input() {
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr, llm.clone());

        let err = processor.run(&ReportInput::default()).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingInput));
        assert_eq!(err.code(), "MISSING_INPUT");
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn blank_ocr_text_is_empty_input() {
        let ocr = Arc::new(MockOcrEngine::new("  \n\t ", 95.0));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr, llm.clone());

        let err = processor.run(&ReportInput::from_file(vec![1, 2])).unwrap_err();
        assert!(matches!(err, ProcessingError::EmptyInput));
        assert!(err.is_client_error());
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn ocr_failure_is_collaborator_error() {
        let ocr = Arc::new(MockOcrEngine::failing("engine crashed"));
        let llm = Arc::new(MockLlmClient::new(&hemoglobin_response()));
        let processor = build_test_processor(ocr, llm);

        let err = processor.run(&ReportInput::from_file(vec![1])).unwrap_err();
        assert!(matches!(err, ProcessingError::Collaborator { .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn fabricated_test_is_unprocessed() {
        let response = r#"{"status":"ok","tests":[
            {"name":"Hemoglobin","value":13.5,"unit":"g/dL","status":"normal","ref_range":{"low":13,"high":17}},
            {"name":"Vitamin D","value":30,"unit":"ng/mL","status":"normal","ref_range":"NA"}
        ],"summary":"s"}"#;
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::new(response));
        let processor = build_test_processor(ocr, llm);

        let outcome = processor.run(&ReportInput::from_text(REPORT)).unwrap();
        assert_eq!(
            outcome,
            ReportOutcome::Unprocessed {
                reason: "hallucinated test not present in input: Vitamin D".into()
            }
        );
    }

    #[test]
    fn model_declared_unprocessed_passes_through() {
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::new(
            r#"{"status":"unprocessed","reason":"invalid unit for test"}"#,
        ));
        let processor = build_test_processor(ocr, llm);

        let outcome = processor.run(&ReportInput::from_text("Hemoglobin 13.5 ohm")).unwrap();
        assert_eq!(
            outcome,
            ReportOutcome::Unprocessed {
                reason: "invalid unit for test".into()
            }
        );
    }

    #[test]
    fn non_json_response_is_collaborator_error_with_excerpt() {
        let garbage = format!("Here is the summary you asked for. {}", "blah ".repeat(100));
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::new(&garbage));
        let processor = build_test_processor(ocr, llm);

        let err = processor.run(&ReportInput::from_text(REPORT)).unwrap_err();
        assert_eq!(err.code(), "COLLABORATOR_ERROR");
        let debug = err.debug().unwrap();
        assert_eq!(debug.chars().count(), 200);
        assert!(garbage.starts_with(debug));
    }

    #[test]
    fn missing_tests_array_is_schema_violation() {
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::new(r#"{"status":"ok","summary":"s"}"#));
        let processor = build_test_processor(ocr, llm);

        let err = processor.run(&ReportInput::from_text(REPORT)).unwrap_err();
        assert!(matches!(err, ProcessingError::SchemaViolation(_)));
    }

    #[test]
    fn extraction_timeout_is_collaborator_timeout() {
        let ocr = Arc::new(MockOcrEngine::new("x", 99.0));
        let llm = Arc::new(MockLlmClient::with_reply(MockReply::Timeout(120)));
        let processor = build_test_processor(ocr, llm);

        let err = processor.run(&ReportInput::from_text(REPORT)).unwrap_err();
        assert_eq!(err.code(), "COLLABORATOR_TIMEOUT");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = ReportOutcome::Unprocessed {
            reason: "r".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"status": "unprocessed", "reason": "r"}));

        let ok = ReportOutcome::Ok {
            tests: vec![TestRecord::named("WBC")],
            summary: String::new(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["tests"][0]["value"], "NA");
        assert_eq!(json["tests"][0]["ref_range"], "NA");
    }

    #[test]
    fn build_processor_from_config() {
        let config = ServiceConfig::from_lookup(|key| match key {
            "EXTRACTION_BACKEND" => Some("ollama".to_string()),
            _ => None,
        })
        .unwrap();
        let processor = build_processor(&config).unwrap();
        assert_eq!(processor.structurer.model_name(), "medgemma:4b");
        assert_eq!(processor.ocr_language, "eng");
    }
}
