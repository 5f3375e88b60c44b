use super::confidence::check_ocr_confidence;
use super::types::{OcrEngine, ReportInput, ResolvedText, TextOrigin};
use super::ExtractionError;

/// Turn an inbound report into plain text.
///
/// A non-empty uploaded file takes precedence and goes through OCR plus the
/// confidence gate. Otherwise a raw-text field that is non-blank is returned
/// verbatim. Anything else is `MissingInput`.
///
/// The OCR text itself may still be blank; the caller checks that.
pub fn resolve_source_text(
    input: &ReportInput,
    ocr: &dyn OcrEngine,
    lang: &str,
) -> Result<ResolvedText, ExtractionError> {
    if let Some(bytes) = input.file.as_deref().filter(|b| !b.is_empty()) {
        tracing::info!(image_size = bytes.len(), "Source: file via OCR");
        let result = ocr.recognize(bytes, lang)?;
        check_ocr_confidence(&result)?;
        return Ok(ResolvedText {
            text: result.text,
            origin: TextOrigin::Ocr,
            ocr_confidence: Some(result.confidence),
        });
    }

    if let Some(text) = input.text.as_deref().filter(|t| !t.trim().is_empty()) {
        tracing::info!(text_len = text.len(), "Source: raw text field");
        return Ok(ResolvedText {
            text: text.to_string(),
            origin: TextOrigin::RawText,
            ocr_confidence: None,
        });
    }

    Err(ExtractionError::MissingInput)
}
