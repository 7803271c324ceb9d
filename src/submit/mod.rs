// Submission to the translation backend
//
// - body: streamed upload body that reports bytes as they are handed to the transport
// - http: multipart POST against the configured endpoint

pub mod body;
pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use http::HttpSubmitter;

use crate::config::SubmissionConfig;
use crate::error::Result;
use crate::i18n::LanguageOption;
use crate::job::InputRef;

/// Byte progress callback: `(bytes_sent, total_bytes)`.
pub type ByteProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Everything the backend needs for one job.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub job_id: Uuid,
    pub input: InputRef,
    pub source: LanguageOption,
    pub target: LanguageOption,
}

/// A single submission call. Implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Send the request, reporting byte progress while the body is
    /// transmitted, and return the parsed response body.
    async fn submit(
        &self,
        request: &SubmissionRequest,
        progress: ByteProgress,
    ) -> Result<serde_json::Value>;
}

/// Factory for creating submitter instances
pub struct SubmitterFactory;

impl SubmitterFactory {
    /// Create the default HTTP submitter
    pub fn create_submitter(config: SubmissionConfig) -> Result<Box<dyn Submitter>> {
        Ok(Box::new(HttpSubmitter::new(config)?))
    }
}
