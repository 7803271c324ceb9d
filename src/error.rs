use thiserror::Error;

use crate::job::Phase;

#[derive(Error, Debug)]
pub enum VidtransError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing or invalid input, raised before anything reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection refused, timeout, or a body that could not be streamed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the backend
    #[error("{}", server_error_message(.status, .detail))]
    Server { status: u16, detail: Option<String> },

    /// Backend-reported failure while the translation was running
    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Cannot {operation} while the job is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Unknown language code: '{0}'")]
    UnknownLanguage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Server-provided detail verbatim, or a generic message when the body had none.
pub fn server_error_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => detail.clone(),
        _ => format!("Request failed with HTTP status {}", status),
    }
}

impl From<reqwest::Error> for VidtransError {
    fn from(e: reqwest::Error) -> Self {
        VidtransError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidtransError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_shows_detail_verbatim() {
        let err = VidtransError::Server {
            status: 500,
            detail: Some("bad codec".to_string()),
        };
        assert_eq!(err.to_string(), "bad codec");
    }

    #[test]
    fn test_server_error_without_detail_is_generic() {
        let err = VidtransError::Server {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "Request failed with HTTP status 502");
    }

    #[test]
    fn test_invalid_state_message_names_phase() {
        let err = VidtransError::InvalidState {
            operation: "submit",
            phase: Phase::Uploading,
        };
        assert_eq!(err.to_string(), "Cannot submit while the job is uploading");
    }
}
