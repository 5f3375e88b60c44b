use super::ExtractionError;

/// Inbound report as handed over by the HTTP layer.
///
/// At most one of the two fields is used; the uploaded file wins.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub file: Option<Vec<u8>>,
    pub text: Option<String>,
}

impl ReportInput {
    pub fn from_text(text: &str) -> Self {
        Self {
            file: None,
            text: Some(text.to_string()),
        }
    }

    pub fn from_file(bytes: Vec<u8>) -> Self {
        Self {
            file: Some(bytes),
            text: None,
        }
    }
}

/// Where the resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    Ocr,
    RawText,
}

/// Output of the resolver, before the emptiness check.
#[derive(Debug, Clone)]
pub struct ResolvedText {
    pub text: String,
    pub origin: TextOrigin,
    /// Mean OCR confidence (0–100). `None` for raw text.
    pub ocr_confidence: Option<f32>,
}

/// Report text that is guaranteed non-blank. The only input the
/// extraction and guardrail stages accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText(String);

impl SourceText {
    /// Returns `None` when the text is empty after trimming.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raw OCR result from the engine. Confidence is on a 0–100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn recognize(&self, image_bytes: &[u8], lang: &str) -> Result<OcrResult, ExtractionError>;
}
