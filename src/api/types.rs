//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::pipeline::processor::ReportProcessor;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<ReportProcessor>,
    /// Extraction backend name reported by `/api/health`.
    pub backend: &'static str,
    pub max_upload_bytes: usize,
    pub max_concurrent_requests: usize,
}

impl ApiContext {
    pub fn new(processor: Arc<ReportProcessor>, config: &ServiceConfig) -> Self {
        Self {
            processor,
            backend: config.backend.name(),
            max_upload_bytes: config.max_upload_bytes,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }
}
