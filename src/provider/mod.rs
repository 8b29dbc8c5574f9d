//! Image provider abstraction.
//!
//! [`ImageProvider`] is the seam between the pipeline and the remote image
//! service. Two implementations live here:
//!
//! - [`OpenAiProvider`]: the HTTP client for the `images/generations` and
//!   `images/edits` endpoints.
//! - [`Retrying`]: a decorator that runs every call of an inner provider
//!   under a [`RetryPolicy`].
//!
//! Workflows take `&dyn ImageProvider` so tests can substitute a scripted
//! provider without network access.

mod openai;
mod retry;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use retry::{RetryPolicy, Retrying};

use crate::types::ImageSize;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response contained no images")]
    EmptyResponse,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ProviderError {
    /// Whether another attempt could succeed. Missing configuration and
    /// unreadable local input fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::NotConfigured(_) | ProviderError::Io { .. })
    }
}

/// A remote image generation/edit service.
#[async_trait]
pub trait ImageProvider: Send + Sync + fmt::Debug {
    /// Generate `count` images for `prompt` at `size`. Returns one encoded
    /// image buffer per image, in provider order.
    async fn generate(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u32,
    ) -> Result<Vec<Vec<u8>>, ProviderError>;

    /// Edit the image at `image_path` guided by `prompt`. With `transparent`
    /// the service is asked for a transparent background.
    async fn edit(
        &self,
        image_path: &Path,
        prompt: &str,
        size: ImageSize,
        transparent: bool,
    ) -> Result<Vec<u8>, ProviderError>;

    /// Short provider name for logs and reports (e.g. "openai").
    fn provider_name(&self) -> &'static str;
}
