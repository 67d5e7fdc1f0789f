//! Analysis service trait

use async_trait::async_trait;
use piiguard_core::{AnalysisResult, SelectedFile};

use crate::error::Result;

/// Raw image bytes returned by the redaction endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedImage {
    pub content: Vec<u8>,
    pub media_type: String,
}

/// The two calls the orchestrator depends on
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Extract text, detect PII and score risk for one document
    async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult>;

    /// Produce a visually redacted copy of an image
    async fn redact_image(&self, file: &SelectedFile) -> Result<RedactedImage>;
}
