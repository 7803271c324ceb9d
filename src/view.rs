//! Render modes derived purely from a `JobSnapshot`.

use crate::artifact::{ArtifactRef, CaptionSelector};
use crate::i18n::I18n;
use crate::job::{JobSnapshot, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    Translating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    SelectionForm,
    Progress { stage: Stage, percent: u8 },
    Result {
        artifact: ArtifactRef,
        captions: CaptionSelector,
    },
    Failure { message: String },
}

impl View {
    /// Map the orchestrator's current state to what should be on screen.
    pub fn from_snapshot(snapshot: &JobSnapshot, captions: CaptionSelector) -> Self {
        match snapshot.phase {
            Phase::Idle => View::SelectionForm,
            Phase::Uploading => View::Progress {
                stage: Stage::Uploading,
                percent: snapshot.percent,
            },
            Phase::Translating => View::Progress {
                stage: Stage::Translating,
                percent: snapshot.percent,
            },
            Phase::Completed => match &snapshot.result_ref {
                Some(artifact) => View::Result {
                    artifact: artifact.clone(),
                    captions,
                },
                None => View::Failure {
                    message: "Translation finished without a result".to_string(),
                },
            },
            Phase::Failed => View::Failure {
                message: snapshot
                    .failure
                    .as_ref()
                    .map(|f| f.message())
                    .unwrap_or_else(|| "Translation failed".to_string()),
            },
        }
    }

    pub fn title_key(&self) -> &'static str {
        match self {
            View::SelectionForm => phase_title_key(Phase::Idle),
            View::Progress {
                stage: Stage::Uploading,
                ..
            } => phase_title_key(Phase::Uploading),
            View::Progress {
                stage: Stage::Translating,
                ..
            } => phase_title_key(Phase::Translating),
            View::Result { .. } => phase_title_key(Phase::Completed),
            View::Failure { .. } => phase_title_key(Phase::Failed),
        }
    }

    pub fn description_key(&self) -> Option<&'static str> {
        match self {
            View::Progress {
                stage: Stage::Uploading,
                ..
            } => Some("translate.uploadingDescription"),
            View::Progress {
                stage: Stage::Translating,
                ..
            } => Some("translate.translatingDescription"),
            View::Result { .. } => Some("translate.completedDescription"),
            View::SelectionForm | View::Failure { .. } => None,
        }
    }

    /// Plain-text rendering for the terminal.
    pub fn render_text(&self, i18n: &I18n) -> String {
        let mut lines = vec![i18n.t(self.title_key())];
        if let Some(key) = self.description_key() {
            lines.push(i18n.t(key));
        }

        match self {
            View::SelectionForm => {
                lines.push(format!("{}:", i18n.t("form.selectLanguage")));
                for language in i18n.catalog().iter() {
                    lines.push(format!("  {}  {}", language.code, language.label()));
                }
            }
            View::Progress { stage, percent } => {
                lines.push(format!("{}%", percent));
                if *stage == Stage::Uploading {
                    lines.push(i18n.t("translate.uploadingNote"));
                }
            }
            View::Result { artifact, captions } => {
                lines.push(format!("{}: {}", i18n.t("result.video"), artifact.video_path));
                match artifact.showing(captions) {
                    Some(track) => lines.push(format!(
                        "{}: {} ({})",
                        i18n.t("result.captions"),
                        track.label,
                        track.path
                    )),
                    None => lines.push(format!(
                        "{}: {}",
                        i18n.t("result.captions"),
                        i18n.t("result.captionsOff")
                    )),
                }
                for track in &artifact.captions {
                    lines.push(format!("  [{}] {}", track.language, track.path));
                }
            }
            View::Failure { message } => {
                lines.push(message.clone());
                lines.push(i18n.t("result.newTranslation"));
            }
        }

        lines.join("\n")
    }
}

/// Heading for a phase, usable straight from a `ProgressEvent`.
pub fn phase_title_key(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "translate.title",
        Phase::Uploading => "translate.uploading",
        Phase::Translating => "translate.translating",
        Phase::Completed => "translate.completed",
        Phase::Failed => "result.failed",
    }
}
