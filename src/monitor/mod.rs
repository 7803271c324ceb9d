// Following a job once the backend has accepted the upload
//
// - simulated: randomized placeholder progress on a timer (no backend status channel)
// - polling: periodic requests to a backend status endpoint
//
// Both drive the same contract: percent reports while translating, then either
// the finished artifact or an error.

pub mod polling;
pub mod simulated;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use polling::PollingMonitor;
pub use simulated::SimulatedMonitor;

use crate::artifact::ArtifactRef;
use crate::config::{MonitorConfig, MonitorMode};
use crate::error::Result;
use crate::i18n::LanguageOption;

/// Translation progress callback, percent in [0, 100].
pub type PercentSink = Arc<dyn Fn(u8) + Send + Sync>;

/// What a monitor knows about the job it follows.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub job_id: Uuid,
    pub source: LanguageOption,
    pub target: LanguageOption,
    /// Parsed body of the submission response
    pub submission: serde_json::Value,
}

impl MonitorContext {
    /// Backend job identifier from the submission response (`job_id` as a
    /// string or number), else the local job id.
    pub fn remote_job_id(&self) -> String {
        match self.submission.get("job_id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => self.job_id.to_string(),
        }
    }

    /// Caption label for a language code taken from the job's languages.
    pub fn label_for(&self, code: &str) -> String {
        [&self.source, &self.target]
            .into_iter()
            .find(|l| l.code == code)
            .map(|l| l.display_name.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

/// Main trait for following translation progress
#[async_trait]
pub trait TranslationMonitor: Send + Sync {
    /// Report progress until the translation settles. Returns the artifact on
    /// success; any backend-reported failure is an error.
    async fn monitor(&self, job: &MonitorContext, report: PercentSink) -> Result<ArtifactRef>;
}

/// Factory for creating monitor instances
pub struct MonitorFactory;

impl MonitorFactory {
    /// Create a monitor based on the configured mode
    pub fn create_monitor(config: MonitorConfig) -> Result<Box<dyn TranslationMonitor>> {
        match config.mode {
            MonitorMode::Simulated => Ok(Box::new(SimulatedMonitor::new(config))),
            MonitorMode::Polling => Ok(Box::new(PollingMonitor::new(config)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(submission: serde_json::Value) -> MonitorContext {
        MonitorContext {
            job_id: Uuid::nil(),
            source: LanguageOption::new("en", "English", "🇺🇸", "English"),
            target: LanguageOption::new("mn", "Монгол", "🇲🇳", "Mongolian"),
            submission,
        }
    }

    #[test]
    fn test_remote_job_id_prefers_response() {
        assert_eq!(context(json!({"job_id": "abc"})).remote_job_id(), "abc");
        assert_eq!(context(json!({"job_id": 42})).remote_job_id(), "42");
        assert_eq!(
            context(json!({"status": "ok"})).remote_job_id(),
            Uuid::nil().to_string()
        );
    }

    #[test]
    fn test_label_for() {
        let ctx = context(json!({}));
        assert_eq!(ctx.label_for("mn"), "Монгол");
        assert_eq!(ctx.label_for("ja"), "ja");
    }
}
