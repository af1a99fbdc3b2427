use thiserror::Error;
use tracing::{error, warn};

/// Every failure surfaces to bus subscribers as an `error` event whose
/// message is this type's `Display` output, so the strings here are the
/// user-facing ones.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("There is no URL to embed.")]
    MissingUrl,

    #[error("An API Key is required to fetch and embed.")]
    KeyRequired,

    #[error("The proposed URL is invalid.")]
    InvalidUrl,

    #[error("{message} ({code}).")]
    ServiceError { message: String, code: u16 },

    #[error("{status} ({code}).")]
    HttpStatus { status: String, code: u16 },

    #[error("The request encountered an error, please try again later ({code}).")]
    RequestFailed { code: u16 },

    #[error("Failed to fetch content: {0}")]
    Transport(String),

    #[error("Failed to parse metadata: {0}")]
    DecodeError(String),

    #[error("This url has not enough metadata to create a preview.")]
    NotEnoughMetadata,
}

impl EmbedError {
    pub fn log(&self) {
        match self {
            EmbedError::MissingUrl => {
                warn!("Submission rejected: empty URL");
            }
            EmbedError::KeyRequired => {
                warn!("Submission rejected: no API key and no fixture override");
            }
            EmbedError::InvalidUrl => {
                warn!("Submission rejected: URL failed the acceptance pattern");
            }
            EmbedError::ServiceError { message, code } => {
                error!(code = %code, error = %message, "Extraction service reported an error");
            }
            EmbedError::HttpStatus { status, code } => {
                error!(code = %code, status = %status, "Extraction request failed");
            }
            EmbedError::RequestFailed { code } => {
                error!(code = %code, "Extraction request failed without a status line");
            }
            EmbedError::Transport(e) => {
                error!(error = %e, "Content fetch failed");
            }
            EmbedError::DecodeError(e) => {
                error!(error = %e, "Metadata payload could not be decoded");
            }
            EmbedError::NotEnoughMetadata => {
                warn!("Metadata payload below the title+description minimum");
            }
        }
    }
}
