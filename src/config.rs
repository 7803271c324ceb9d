use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, VidtransError};
use crate::i18n::LanguageOption;

// Default values for optional fields
fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_poll_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Extra languages appended to the built-in catalog
    #[serde(default)]
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Backend endpoint receiving the multipart upload
    pub endpoint: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Size of each streamed body chunk in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// How languages are written into the `source_lang`/`target_lang` fields
    pub language_field: LanguageField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageField {
    /// Catalog code, e.g. "mn"
    Code,
    /// Catalog wire name, e.g. "Mongolian"
    WireName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How translation progress is followed once the upload is accepted
    pub mode: MonitorMode,
    /// Simulated mode: delay between progress ticks
    pub tick_interval_ms: u64,
    /// Simulated mode: smallest increment per tick
    pub min_increment: f64,
    /// Simulated mode: largest increment per tick (exclusive)
    pub max_increment: f64,
    /// Simulated mode: fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Simulated mode: retrieval path reported for the finished video
    pub result_path: String,
    /// Polling mode: status URL, `{job_id}` is substituted
    pub status_url: String,
    /// Polling mode: delay between status requests
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorMode {
    /// Simulated: randomized placeholder progress, no backend status channel
    Simulated,
    /// Polling: query the backend status endpoint until the job settles
    Polling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Active UI language code
    pub language: String,
    /// Directory of `<code>.toml` string tables merged over the built-ins
    pub locales_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            submission: SubmissionConfig::default(),
            monitor: MonitorConfig::default(),
            ui: UiConfig::default(),
            languages: Vec::new(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8002/analyze".to_string(),
            timeout_secs: 600,
            chunk_size: default_chunk_size(),
            language_field: LanguageField::WireName,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Simulated,
            tick_interval_ms: 800,
            min_increment: 1.0,
            max_increment: 15.0,
            seed: None,
            result_path: "/sample-video.mp4".to_string(),
            status_url: "http://127.0.0.1:8002/status/{job_id}".to_string(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            locales_dir: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidtransError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| VidtransError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidtransError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidtransError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.submission.endpoint.trim().is_empty() {
            return Err(VidtransError::Config("submission.endpoint is empty".to_string()));
        }
        if self.submission.chunk_size == 0 {
            return Err(VidtransError::Config("submission.chunk_size must be > 0".to_string()));
        }
        let monitor = &self.monitor;
        if monitor.max_increment <= 0.0 || monitor.min_increment < 0.0 {
            return Err(VidtransError::Config(
                "monitor increments must be positive".to_string(),
            ));
        }
        if monitor.min_increment > monitor.max_increment {
            return Err(VidtransError::Config(format!(
                "monitor.min_increment ({}) exceeds monitor.max_increment ({})",
                monitor.min_increment, monitor.max_increment
            )));
        }
        if monitor.mode == MonitorMode::Polling && !monitor.status_url.contains("{job_id}") {
            return Err(VidtransError::Config(
                "monitor.status_url must contain {job_id}".to_string(),
            ));
        }
        Ok(())
    }
}
