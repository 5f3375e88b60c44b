use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{OcrEngine, OcrResult};
use super::ExtractionError;

/// HTTP client for an OCR sidecar (Tesseract behind a small JSON API).
///
/// `POST {base_url}/recognize` with `{ "image": <base64>, "lang": "eng" }`,
/// answered with `{ "text": "...", "confidence": 0..100 }`.
pub struct OcrServiceClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OcrServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: String,
    lang: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    text: String,
    confidence: f32,
}

impl OcrEngine for OcrServiceClient {
    fn recognize(&self, image_bytes: &[u8], lang: &str) -> Result<OcrResult, ExtractionError> {
        let _span = tracing::info_span!(
            "ocr_recognize",
            lang,
            image_size = image_bytes.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let url = format!("{}/recognize", self.base_url);
        let body = RecognizeRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            lang,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::OcrTimeout(self.timeout_secs)
            } else if e.is_connect() {
                ExtractionError::OcrConnection(self.base_url.clone())
            } else {
                ExtractionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::OcrProcessing(format!(
                "OCR service returned status {}",
                status.as_u16()
            )));
        }

        let parsed: RecognizeResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::OcrTimeout(self.timeout_secs)
            } else {
                ExtractionError::OcrProcessing(format!("Malformed OCR response: {e}"))
            }
        })?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = parsed.text.len(),
            confidence = parsed.confidence,
            "OCR complete"
        );

        Ok(OcrResult {
            text: parsed.text,
            confidence: parsed.confidence,
        })
    }
}

/// Mock OCR engine for unit testing without an OCR service.
pub struct MockOcrEngine {
    result: Result<OcrResult, String>,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            result: Ok(OcrResult {
                text: text.to_string(),
                confidence,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// An engine whose every call fails with `OcrProcessing`.
    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8], _lang: &str) -> Result<OcrResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map_err(ExtractionError::OcrProcessing)
    }
}
