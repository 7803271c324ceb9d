use futures_util::StreamExt;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::SubmissionConfig;
use crate::error::{Result, VidtransError};
use crate::submit::http::detail_from_body;
use crate::submit::ByteProgress;

/// Fetches a finished artifact (video or caption track) from the backend.
///
/// Artifact paths are usually origin-relative (`/sample-video.mp4`) and are
/// resolved against the submission endpoint. Absolute http(s) URLs are used
/// as given.
pub struct ArtifactDownloader {
    client: Client,
    base: Url,
}

impl ArtifactDownloader {
    pub fn new(config: &SubmissionConfig) -> Result<Self> {
        let base = Url::parse(config.endpoint.trim()).map_err(|e| {
            VidtransError::Config(format!(
                "Invalid submission endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;
        let client = Client::builder()
            .user_agent(concat!("vidtrans/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, base })
    }

    pub fn resolve(&self, artifact_path: &str) -> Result<Url> {
        let artifact_path = artifact_path.trim();
        if artifact_path.is_empty() {
            return Err(VidtransError::Validation("Artifact path is empty".to_string()));
        }
        if let Ok(url) = Url::parse(artifact_path) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
        }
        self.base.join(artifact_path).map_err(|e| {
            VidtransError::Validation(format!("Invalid artifact path '{}': {}", artifact_path, e))
        })
    }

    /// Stream the artifact to `dest`, reporting `(bytes_written, total)`.
    /// The body goes to a `.part` file first, so `dest` only appears once the
    /// download is complete.
    pub async fn download(
        &self,
        artifact_path: &str,
        dest: &Path,
        progress: ByteProgress,
    ) -> Result<u64> {
        let url = self.resolve(artifact_path)?;
        info!("Downloading {} to {}", url, dest.display());

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| VidtransError::Transport(format!("Download request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .ok()
                .and_then(|text| detail_from_body(&text));
            warn!("Download of {} failed ({})", url, status);
            return Err(VidtransError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        let total = response.content_length().unwrap_or(0);
        let temp_path = dest.with_extension("part");
        let mut file = fs::File::create(&temp_path).await?;
        let mut written: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(VidtransError::Transport(format!(
                        "Download interrupted: {}",
                        e
                    )));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(written, total.max(written));
        }

        file.flush().await?;
        drop(file);

        // Move temp file to final location
        fs::rename(&temp_path, dest).await?;
        debug!("Wrote {} bytes to {}", written, dest.display());

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(endpoint: &str) -> ArtifactDownloader {
        ArtifactDownloader::new(&SubmissionConfig {
            endpoint: endpoint.to_string(),
            ..SubmissionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_against_endpoint_origin() {
        let d = downloader("http://127.0.0.1:8002/analyze");
        assert_eq!(
            d.resolve("/sample-video.mp4").unwrap().as_str(),
            "http://127.0.0.1:8002/sample-video.mp4"
        );
        assert_eq!(
            d.resolve("/subs/sample-video.mn.vtt").unwrap().as_str(),
            "http://127.0.0.1:8002/subs/sample-video.mn.vtt"
        );
        assert_eq!(
            d.resolve("https://cdn.example.com/v.mp4").unwrap().as_str(),
            "https://cdn.example.com/v.mp4"
        );
        assert!(d.resolve("  ").is_err());
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let result = ArtifactDownloader::new(&SubmissionConfig {
            endpoint: "not a url".to_string(),
            ..SubmissionConfig::default()
        });
        assert!(matches!(result, Err(VidtransError::Config(_))));
    }

    #[tokio::test]
    async fn test_download_streams_to_disk() {
        let server = MockServer::start().await;
        let body = vec![42u8; 300_000];
        Mock::given(method("GET"))
            .and(path("/sample-video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("translated.mp4");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ByteProgress = Arc::new(move |sent, total| sink.lock().unwrap().push((sent, total)));

        let written = downloader(&format!("{}/analyze", server.uri()))
            .download("/sample-video.mp4", &dest, progress)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!dest.with_extension("part").exists());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&(300_000, 300_000)));
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("translated.mp4");
        let err = downloader(&server.uri())
            .download("/sample-video.mp4", &dest, Arc::new(|_, _| {}))
            .await
            .unwrap_err();

        assert!(matches!(err, VidtransError::Server { status: 404, .. }));
        assert_eq!(err.to_string(), "Not Found");
        assert!(!dest.exists());
    }
}
