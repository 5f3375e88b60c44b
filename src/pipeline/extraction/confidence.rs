use super::types::OcrResult;
use super::ExtractionError;
use crate::config::OCR_CONFIDENCE_THRESHOLD;

/// Reject OCR output whose mean confidence is below the usable threshold.
///
/// The threshold is inclusive: exactly 60 passes.
pub fn check_ocr_confidence(result: &OcrResult) -> Result<(), ExtractionError> {
    // NaN is unusable.
    if result.confidence.is_nan() || result.confidence < OCR_CONFIDENCE_THRESHOLD {
        tracing::warn!(
            confidence = result.confidence,
            threshold = OCR_CONFIDENCE_THRESHOLD,
            "OCR confidence below threshold"
        );
        return Err(ExtractionError::LowConfidence {
            confidence: result.confidence,
        });
    }
    Ok(())
}
