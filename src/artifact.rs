use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// A caption track published alongside the translated video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code of the track
    pub language: String,
    /// Label shown in the track selector
    pub label: String,
    /// Retrieval path of the track (e.g. a WebVTT file)
    pub path: String,
}

/// Retrieval reference for the translated video and its caption tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub video_path: String,
    pub captions: Vec<CaptionTrack>,
}

impl ArtifactRef {
    pub fn new(video_path: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            captions: Vec::new(),
        }
    }

    /// Add a caption track at `/subs/<video stem>.<code>.vtt`. A language that
    /// already has a track is skipped.
    pub fn with_caption(mut self, language: &str, label: &str) -> Self {
        if self.track(language).is_some() {
            return self;
        }
        let stem = Path::new(&self.video_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        self.captions.push(CaptionTrack {
            language: language.to_string(),
            label: label.to_string(),
            path: format!("/subs/{}.{}.vtt", stem, language),
        });
        self
    }

    pub fn track(&self, language: &str) -> Option<&CaptionTrack> {
        self.captions.iter().find(|t| t.language == language)
    }

    /// Which track is showing for the given selector. `Off` and unknown
    /// languages leave every track disabled.
    pub fn showing(&self, selector: &CaptionSelector) -> Option<&CaptionTrack> {
        match selector {
            CaptionSelector::Off => None,
            CaptionSelector::Language(code) => self.track(code),
        }
    }
}

/// Caption track selector with an explicit "off" choice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptionSelector {
    #[default]
    Off,
    Language(String),
}

impl FromStr for CaptionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("off") {
            Ok(CaptionSelector::Off)
        } else {
            Ok(CaptionSelector::Language(s.to_string()))
        }
    }
}
