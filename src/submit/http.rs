use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::body::ProgressBody;
use super::{ByteProgress, SubmissionRequest, Submitter};
use crate::config::{LanguageField, SubmissionConfig};
use crate::error::{Result, VidtransError};
use crate::i18n::LanguageOption;
use crate::job::InputRef;

/// Multipart POST to the translation backend.
///
/// Form fields: `file` (or `url` when the input is a link), `source_lang`,
/// `target_lang`.
pub struct HttpSubmitter {
    client: Client,
    config: SubmissionConfig,
}

impl HttpSubmitter {
    pub fn new(config: SubmissionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vidtrans/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn language_value<'a>(&self, language: &'a LanguageOption) -> &'a str {
        match self.config.language_field {
            LanguageField::Code => &language.code,
            LanguageField::WireName => language.wire_name(),
        }
    }

    async fn build_form(&self, request: &SubmissionRequest, progress: ByteProgress) -> Result<Form> {
        let form = Form::new()
            .text("source_lang", self.language_value(&request.source).to_string())
            .text("target_lang", self.language_value(&request.target).to_string());

        match &request.input {
            InputRef::File(path) => {
                let body = ProgressBody::open(path, self.config.chunk_size, progress)
                    .await
                    .map_err(|e| {
                        VidtransError::Transport(format!(
                            "Failed to read {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                let total = body.total();
                info!("Uploading {} ({} bytes) to {}", path.display(), total, self.config.endpoint);

                let part = Part::stream_with_length(Body::wrap_stream(body), total)
                    .file_name(file_name(path))
                    .mime_str(mime_for(path))?;
                Ok(form.part("file", part))
            }
            InputRef::Url(url) => {
                info!("Submitting URL {} to {}", url, self.config.endpoint);
                progress(0, 0);
                Ok(form.text("url", url.trim().to_string()))
            }
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        request: &SubmissionRequest,
        progress: ByteProgress,
    ) -> Result<Value> {
        let form = self.build_form(request, progress).await?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VidtransError::Transport(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            warn!("Backend rejected job {} ({}): {:?}", request.job_id, status, detail);
            return Err(VidtransError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| VidtransError::Transport(format!("Failed to read response: {}", e)))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!("Backend accepted job {}: {}", request.job_id, body);
        Ok(body)
    }
}

/// Pull a human-readable `detail` out of an error response body, if any.
async fn error_detail(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    detail_from_body(&text)
}

pub(crate) fn detail_from_body(text: &str) -> Option<String> {
    let body: Value = serde_json::from_str(text).ok()?;
    match body.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Null => None,
        // Structured details (e.g. a list of field validation errors)
        other => Some(other.to_string()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
