//! Failure taxonomy shared by the resolvers, the download orchestrator and the
//! HTTP layer.
//!
//! Engine adapters and config helpers work with `anyhow` internally; every
//! public operation converts those errors into [`Error`] at its boundary so
//! the API can pick a status code without inspecting message text.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unsupported URL. Reported to the caller as a 400.
    #[error("{0}")]
    InvalidInput(String),

    /// Metadata lookup failed after every available engine was tried.
    #[error("{0}")]
    Resolution(String),

    /// The engine could not fetch the requested media.
    #[error("Failed to download video: {0}")]
    Download(String),

    /// The engine reported success but nothing exists at the computed path.
    #[error("Download failed - file not found")]
    MissingFile(PathBuf),
}

impl Error {
    pub fn missing_url() -> Self {
        Self::InvalidInput("URL is required".to_owned())
    }

    pub fn unsupported_url() -> Self {
        Self::InvalidInput(
            "Unsupported URL. Please provide a valid Instagram or YouTube URL.".to_owned(),
        )
    }

    /// True for failures caused by the request itself rather than by an
    /// upstream engine.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Renders an `anyhow` error with its whole context chain on one line.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
