//! Image processing backend trait and shared types.
//!
//! The [`ConvertBackend`] trait defines the two operations the thumbnailer
//! needs from the outside world: identify (measure a source image) and
//! convert (run one external transformation).
//!
//! The production implementation is
//! [`MagickBackend`](super::magick_backend::MagickBackend), which identifies
//! in-process and shells out to ImageMagick's `convert` for the pixel work.

use super::params::ConvertParams;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Outcome of one external conversion.
///
/// A tool that could not be started, was killed, or timed out is reported as
/// `Failed { code: None }`. Callers treat every failure the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConvertStatus {
    Success,
    Failed { code: Option<i32> },
}

impl ConvertStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Map a raw exit code the way a shell would report it.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            other => Self::Failed { code: other },
        }
    }
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve jobs running on several threads.
pub trait ConvertBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Run a single conversion and report how it ended.
    fn convert(&self, params: &ConvertParams) -> ConvertStatus;
}
