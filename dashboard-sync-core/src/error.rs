//! Error taxonomy shared by every provider client, storage adapter and sync job.
//!
//! Provider clients fail with [`ProviderError`], storage adapters with [`StoreError`],
//! the media pipeline with [`MediaError`]. Orchestration wraps the first two in
//! [`SyncError`] so a caller can tell an upstream failure from a write failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// A credential the client needs was never configured.
    #[error("Missing required environment variable: {0}")]
    MissingCredential(&'static str),

    /// The upstream answered, but not with the shape we expect.
    #[error("Invalid response from {provider} API")]
    InvalidResponse { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API returned status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("failed to decode {provider} response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub(crate) fn transport(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ProviderError::Transport {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ProviderError::Decode {
            provider,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document write failed for {path}: {message}")]
    Write { path: String, message: String },

    #[error("document read failed for {path}: {message}")]
    Read { path: String, message: String },

    #[error("object upload failed for {path}: {message}")]
    Upload { path: String, message: String },

    #[error("object listing failed for bucket {bucket}: {message}")]
    List { bucket: String, message: String },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No media URL provided for {0}")]
    MissingMedia(String),

    #[error("Failed to download media for {id}: {message}")]
    DownloadFailed { id: String, message: String },

    #[error("Failed to upload media to {path}: {message}")]
    UploadFailed { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
