use std::sync::Arc;

use super::parser::parse_extraction_response;
use super::prompt::build_extraction_prompt;
use super::sanitize::sanitize_for_llm;
use super::schema::report_schema;
use super::types::{ExtractionOutcome, FailureKind, LlmClient};
use super::StructuringError;
use crate::pipeline::extraction::SourceText;

/// Runs one extraction call against the structured-extraction service:
/// sanitize → prompt → LLM → parse.
///
/// Exactly one call per report; transport failures become an `error` outcome.
pub struct ReportStructurer {
    llm: Arc<dyn LlmClient + Send + Sync>,
    model_name: String,
}

impl ReportStructurer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, model_name: &str) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn extract(&self, source: &SourceText) -> ExtractionOutcome {
        let _span = tracing::info_span!(
            "extract_tests",
            model = %self.model_name,
            text_len = source.as_str().len()
        )
        .entered();

        let sanitized = sanitize_for_llm(source.as_str());
        let prompt = build_extraction_prompt(&sanitized);

        let raw = match self
            .llm
            .generate_structured(&self.model_name, &prompt, report_schema())
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Extraction service call failed");
                return outcome_for_transport_error(&e);
            }
        };

        let outcome = parse_extraction_response(&raw);
        match &outcome {
            ExtractionOutcome::Ok { tests, .. } => {
                tracing::info!(test_count = tests.len(), "Extraction succeeded");
            }
            ExtractionOutcome::Unprocessed { .. } => {
                tracing::info!("Extraction service declined the report");
            }
            ExtractionOutcome::Error { kind, .. } => {
                tracing::warn!(kind = ?kind, response_len = raw.len(), "Extraction response rejected");
            }
        }
        outcome
    }
}

fn outcome_for_transport_error(err: &StructuringError) -> ExtractionOutcome {
    match err {
        StructuringError::Timeout(secs) => ExtractionOutcome::error(
            FailureKind::Timeout,
            format!("AI processing timed out after {secs}s. Please try again later."),
        ),
        other => ExtractionOutcome::error(
            FailureKind::Collaborator,
            format!("AI processing failed ({other})."),
        ),
    }
}
