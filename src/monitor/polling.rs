use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{MonitorContext, PercentSink, TranslationMonitor};
use crate::artifact::{ArtifactRef, CaptionTrack};
use crate::config::MonitorConfig;
use crate::error::{Result, VidtransError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Body returned by the backend status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result_path: Option<String>,
    /// Caption track paths keyed by language code
    #[serde(default)]
    pub captions: BTreeMap<String, String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Polls `status_url` until the backend reports the job completed or failed.
pub struct PollingMonitor {
    client: Client,
    status_url: String,
    interval: Duration,
}

impl PollingMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vidtrans/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            status_url: config.status_url,
            interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    fn url_for(&self, job: &MonitorContext) -> String {
        self.status_url.replace("{job_id}", &job.remote_job_id())
    }

    async fn fetch(&self, url: &str) -> Result<StatusReport> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VidtransError::Transport(format!("Status request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string));
            return Err(VidtransError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<StatusReport>()
            .await
            .map_err(|e| VidtransError::Processing(format!("Unreadable status response: {}", e)))
    }

    fn artifact(job: &MonitorContext, report: StatusReport) -> Result<ArtifactRef> {
        let video_path = report.result_path.ok_or_else(|| {
            VidtransError::Processing("Backend reported completion without a result path".to_string())
        })?;
        let captions = report
            .captions
            .into_iter()
            .map(|(language, path)| CaptionTrack {
                label: job.label_for(&language),
                language,
                path,
            })
            .collect();

        Ok(ArtifactRef {
            video_path,
            captions,
        })
    }
}

#[async_trait]
impl TranslationMonitor for PollingMonitor {
    async fn monitor(&self, job: &MonitorContext, report: PercentSink) -> Result<ArtifactRef> {
        let url = self.url_for(job);
        info!("Polling {} for job {}", url, job.job_id);

        loop {
            sleep(self.interval).await;
            let status = self.fetch(&url).await?;
            debug!("Job {} status {:?} ({:?}%)", job.job_id, status.status, status.progress);

            match status.status {
                RemoteStatus::Queued => {}
                RemoteStatus::Processing => {
                    if let Some(progress) = status.progress {
                        report(progress.clamp(0.0, 99.0).floor() as u8);
                    }
                }
                RemoteStatus::Completed => return Self::artifact(job, status),
                RemoteStatus::Failed => {
                    let detail = status
                        .detail
                        .unwrap_or_else(|| "Translation failed on the backend".to_string());
                    warn!("Backend reported failure for job {}: {}", job.job_id, detail);
                    return Err(VidtransError::Processing(detail));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorMode;
    use crate::i18n::LanguageOption;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn monitor_for(server: &MockServer) -> PollingMonitor {
        PollingMonitor::new(MonitorConfig {
            mode: MonitorMode::Polling,
            status_url: format!("{}/status/{{job_id}}", server.uri()),
            poll_interval_ms: 5,
            ..MonitorConfig::default()
        })
        .unwrap()
    }

    fn context() -> MonitorContext {
        MonitorContext {
            job_id: Uuid::new_v4(),
            source: LanguageOption::new("en", "English", "🇺🇸", "English"),
            target: LanguageOption::new("mn", "Монгол", "🇲🇳", "Mongolian"),
            submission: json!({"job_id": "remote-1"}),
        }
    }

    fn recorder() -> (PercentSink, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |p| sink.lock().unwrap().push(p)), seen)
    }

    #[tokio::test]
    async fn test_polls_until_completed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/remote-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "processing", "progress": 40.5})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/remote-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "result_path": "/videos/talk_mn.mp4",
                "captions": {"mn": "/subs/talk.mn.vtt"}
            })))
            .mount(&server)
            .await;

        let (report, seen) = recorder();
        let artifact = monitor_for(&server).monitor(&context(), report).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![40, 40]);
        assert_eq!(artifact.video_path, "/videos/talk_mn.mp4");
        assert_eq!(artifact.captions.len(), 1);
        assert_eq!(artifact.captions[0].label, "Монгол");
    }

    #[tokio::test]
    async fn test_backend_failure_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "failed", "detail": "speech not detected"})),
            )
            .mount(&server)
            .await;

        let (report, _) = recorder();
        let err = monitor_for(&server)
            .monitor(&context(), report)
            .await
            .unwrap_err();
        assert!(matches!(err, VidtransError::Processing(ref d) if d == "speech not detected"));
    }

    #[tokio::test]
    async fn test_completed_without_result_path_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
            .mount(&server)
            .await;

        let (report, _) = recorder();
        assert!(monitor_for(&server).monitor(&context(), report).await.is_err());
    }

    #[tokio::test]
    async fn test_status_endpoint_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "unknown job"})))
            .mount(&server)
            .await;

        let (report, _) = recorder();
        let err = monitor_for(&server)
            .monitor(&context(), report)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown job");
    }
}
