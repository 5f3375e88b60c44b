pub mod types;
pub mod confidence;
pub mod ocr;
pub mod source;

pub use types::*;
pub use confidence::*;
pub use ocr::*;
pub use source::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Missing input. Please upload a file (key: 'report_file') or provide text (key: 'report_text').")]
    MissingInput,

    #[error("Low OCR confidence ({confidence:.0}). Please upload a clearer file/image.")]
    LowConfidence { confidence: f32 },

    #[error("OCR service is not reachable at {0}")]
    OcrConnection(String),

    #[error("OCR timed out after {0}s")]
    OcrTimeout(u64),

    #[error("Failed to extract text from the image file: {0}")]
    OcrProcessing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
