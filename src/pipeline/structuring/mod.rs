pub mod types;
pub mod schema;
pub mod prompt;
pub mod sanitize;
pub mod parser;
pub mod gemini;
pub mod ollama;
pub mod orchestrator;

pub use types::*;
pub use schema::*;
pub use prompt::*;
pub use sanitize::*;
pub use parser::*;
pub use gemini::*;
pub use ollama::*;
pub use orchestrator::*;

use thiserror::Error;

/// Transport-level failures talking to the extraction service.
///
/// These never leave the structuring layer as errors; `ReportStructurer`
/// folds them into an `ExtractionOutcome::Error`.
#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Extraction service is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction service returned error (status {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
