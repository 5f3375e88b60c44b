//! Service configuration.
//!
//! Contract constants live here as `const`s. Everything deployment-specific
//! is read from the environment once at startup into `ServiceConfig`.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "report-simplifier";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// OCR results below this mean confidence (0–100 scale) are rejected.
pub const OCR_CONFIDENCE_THRESHOLD: f32 = 60.0;

/// Minimum best-match similarity for a test-name word to count as present.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.40;

/// Maximum characters of an unparseable model response echoed back for diagnosis.
pub const DIAGNOSTIC_EXCERPT_CHARS: usize = 200;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "medgemma:4b";
const DEFAULT_OCR_URL: &str = "http://localhost:8884";
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "report_simplifier=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be set when EXTRACTION_BACKEND is gemini")]
    MissingApiKey(&'static str),

    #[error("Unknown EXTRACTION_BACKEND {0:?} (expected \"gemini\" or \"ollama\")")]
    UnknownBackend(String),
}

/// Which structured-extraction service the pipeline talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionBackend {
    Gemini { api_key: String, base_url: String },
    Ollama { base_url: String },
}

impl ExtractionBackend {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionBackend::Gemini { .. } => "gemini",
            ExtractionBackend::Ollama { .. } => "ollama",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub backend: ExtractionBackend,
    pub extraction_model: String,
    pub ocr_url: String,
    pub ocr_language: String,
    pub ocr_timeout: Duration,
    pub extraction_timeout: Duration,
    pub max_upload_bytes: usize,
    pub max_concurrent_requests: usize,
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_name = get("EXTRACTION_BACKEND").unwrap_or_else(|| "gemini".to_string());
        let (backend, default_model) = match backend_name.trim().to_ascii_lowercase().as_str() {
            "gemini" => {
                let api_key =
                    get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey("GEMINI_API_KEY"))?;
                let base_url =
                    get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());
                (
                    ExtractionBackend::Gemini { api_key, base_url },
                    DEFAULT_GEMINI_MODEL,
                )
            }
            "ollama" => {
                let base_url = get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
                (ExtractionBackend::Ollama { base_url }, DEFAULT_OLLAMA_MODEL)
            }
            _ => return Err(ConfigError::UnknownBackend(backend_name)),
        };

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            backend,
            extraction_model: get("EXTRACTION_MODEL").unwrap_or_else(|| default_model.to_string()),
            ocr_url: get("OCR_URL").unwrap_or_else(|| DEFAULT_OCR_URL.to_string()),
            ocr_language: get("OCR_LANGUAGE").unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            ocr_timeout: Duration::from_secs(parse_or(
                "OCR_TIMEOUT_SECS",
                get("OCR_TIMEOUT_SECS"),
                DEFAULT_OCR_TIMEOUT_SECS,
            )?),
            extraction_timeout: Duration::from_secs(parse_or(
                "EXTRACTION_TIMEOUT_SECS",
                get("EXTRACTION_TIMEOUT_SECS"),
                DEFAULT_EXTRACTION_TIMEOUT_SECS,
            )?),
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            max_concurrent_requests: parse_or(
                "MAX_CONCURRENT_REQUESTS",
                get("MAX_CONCURRENT_REQUESTS"),
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?
            .max(1),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.extraction_model, "gemini-2.5-flash");
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.ocr_timeout, Duration::from_secs(60));
        assert_eq!(config.backend.name(), "gemini");
    }

    #[test]
    fn gemini_requires_api_key() {
        let err = ServiceConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey("GEMINI_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = ServiceConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey("GEMINI_API_KEY"));
    }

    #[test]
    fn ollama_backend_needs_no_key() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("EXTRACTION_BACKEND", "Ollama"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            ExtractionBackend::Ollama {
                base_url: "http://gpu-box:11434".into()
            }
        );
        assert_eq!(config.extraction_model, "medgemma:4b");
    }

    #[test]
    fn invalid_port_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn unknown_backend_rejected() {
        let err =
            ServiceConfig::from_lookup(lookup(&[("EXTRACTION_BACKEND", "openai")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(_)));
    }

    #[test]
    fn concurrency_never_zero() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("MAX_CONCURRENT_REQUESTS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.max_concurrent_requests, 1);
    }

    #[test]
    fn contract_thresholds() {
        assert_eq!(OCR_CONFIDENCE_THRESHOLD, 60.0);
        assert_eq!(FUZZY_MATCH_THRESHOLD, 0.40);
        assert_eq!(DIAGNOSTIC_EXCERPT_CHARS, 200);
    }
}
