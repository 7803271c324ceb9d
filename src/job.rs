//! Translation job model: phases, inputs, progress events and failures.
//!
//! A `TranslationJob` is created by the orchestrator when a submission passes
//! validation and is mutated only by the orchestrator afterwards. Everything
//! else sees a `JobSnapshot` or a stream of `ProgressEvent`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::artifact::ArtifactRef;
use crate::error::{server_error_message, Result, VidtransError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Uploading,
    Translating,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Uploading | Phase::Translating)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Translating => "translating",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the user wants translated: a local file or a remote video URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRef {
    File(PathBuf),
    Url(String),
}

impl InputRef {
    /// Check the input before anything is sent.
    pub fn validate(&self) -> Result<()> {
        match self {
            InputRef::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(VidtransError::Validation(
                        "No video file selected".to_string(),
                    ));
                }
                if !path.is_file() {
                    return Err(VidtransError::Validation(format!(
                        "Video file not found: {}",
                        path.display()
                    )));
                }
                Ok(())
            }
            InputRef::Url(url) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(VidtransError::Validation("No video URL given".to_string()));
                }
                match reqwest::Url::parse(url) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
                    Ok(parsed) => Err(VidtransError::Validation(format!(
                        "Unsupported URL scheme '{}'",
                        parsed.scheme()
                    ))),
                    Err(e) => Err(VidtransError::Validation(format!(
                        "Invalid video URL '{}': {}",
                        url, e
                    ))),
                }
            }
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            InputRef::File(path) => path.display().to_string(),
            InputRef::Url(url) => url.clone(),
        }
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    Transport { message: String },
    Server { status: u16, detail: Option<String> },
    Processing { message: String },
    Cancelled,
}

impl JobFailure {
    /// Text shown to the user in place of the progress display.
    pub fn message(&self) -> String {
        match self {
            JobFailure::Transport { message } => message.clone(),
            JobFailure::Server { status, detail } => server_error_message(status, detail),
            JobFailure::Processing { message } => message.clone(),
            JobFailure::Cancelled => "Translation cancelled by user".to_string(),
        }
    }
}

impl From<&VidtransError> for JobFailure {
    fn from(e: &VidtransError) -> Self {
        match e {
            VidtransError::Transport(message) => JobFailure::Transport {
                message: message.clone(),
            },
            VidtransError::Io(io) => JobFailure::Transport {
                message: io.to_string(),
            },
            VidtransError::Server { status, detail } => JobFailure::Server {
                status: *status,
                detail: detail.clone(),
            },
            VidtransError::Processing(message) => JobFailure::Processing {
                message: message.clone(),
            },
            other => JobFailure::Processing {
                message: other.to_string(),
            },
        }
    }
}

/// The unit of work owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: Uuid,
    pub input: InputRef,
    pub source_language: String,
    pub target_language: String,
    pub phase: Phase,
    pub progress_percent: u8,
    pub result_ref: Option<ArtifactRef>,
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
}

impl TranslationJob {
    pub fn new(input: InputRef, source_language: &str, target_language: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            phase: Phase::Uploading,
            progress_percent: 0,
            result_ref: None,
            failure: None,
            created_at: Utc::now(),
        }
    }

    pub fn event(&self) -> ProgressEvent {
        ProgressEvent {
            job_id: self.id,
            phase: self.phase,
            percent: self.progress_percent,
            at: Utc::now(),
        }
    }
}

/// One observable (phase, percent) change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub phase: Phase,
    pub percent: u8,
    pub at: DateTime<Utc>,
}

/// Read-only view of the orchestrator's current job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub job_id: Option<Uuid>,
    pub phase: Phase,
    pub percent: u8,
    pub result_ref: Option<ArtifactRef>,
    pub failure: Option<JobFailure>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            job_id: None,
            phase: Phase::Idle,
            percent: 0,
            result_ref: None,
            failure: None,
        }
    }
}

impl From<&TranslationJob> for JobSnapshot {
    fn from(job: &TranslationJob) -> Self {
        Self {
            job_id: Some(job.id),
            phase: job.phase,
            percent: job.progress_percent,
            result_ref: job.result_ref.clone(),
            failure: job.failure.clone(),
        }
    }
}

/// floor(sent / total * 100), clamped to [0, 100]. An unknown total reads as 0.
pub fn upload_percent(bytes_sent: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    let percent = (bytes_sent as u128 * 100) / total_bytes as u128;
    percent.min(100) as u8
}
