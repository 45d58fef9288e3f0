//! Production backend: in-process identify, ImageMagick for the pixels.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with a sniffed format (header only) |
//! | Identify (AVIF) | `avif-parse` container metadata |
//! | Convert | `convert` spawned through `std::process::Command` |
//!
//! The format is guessed from the file's leading bytes, with the extension as
//! a fallback, so uploads saved under temp names like `RackMultipart...` or
//! under the wrong extension still identify.
//!
//! The conversion waits for the child without a deadline unless a timeout
//! was configured, in which case the child is polled and killed once the
//! deadline passes.

use super::backend::{BackendError, ConvertBackend, ConvertStatus, Dimensions};
use super::params::ConvertParams;
use image::{ImageFormat, ImageReader};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Backend that identifies with the `image` crate and converts with ImageMagick.
#[derive(Debug, Clone, Default)]
pub struct MagickBackend {
    timeout: Option<Duration>,
}

impl MagickBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill conversions that run longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

/// True when the file starts with an ISO-BMFF `ftyp` box of an AVIF brand.
fn has_avif_brand(path: &Path) -> std::io::Result<bool> {
    let mut header = Vec::with_capacity(12);
    File::open(path)?.take(12).read_to_end(&mut header)?;
    Ok(header.len() == 12
        && &header[4..8] == b"ftyp"
        && matches!(&header[8..12], b"avif" | b"avis"))
}

/// Extract dimensions from an AVIF file's container metadata (no full decode needed).
fn identify_avif(path: &Path) -> Result<Dimensions, BackendError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data)).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Failed to read AVIF metadata {}: {e:?}",
            path.display()
        ))
    })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Wait for `child`, killing it if `timeout` elapses first.
///
/// Returns the exit code, or `None` when the child was killed or ended by a
/// signal.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> std::io::Result<Option<i32>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            log::warn!(
                "conversion exceeded {}s, killing pid {}",
                timeout.as_secs_f32(),
                child.id()
            );
            kill_and_reap(&mut child);
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Best-effort kill; the child may already be gone.
fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill pid {}: {}", child.id(), e);
    }
    let _ = child.wait();
}

fn identify_failed(path: &Path, e: image::ImageError) -> BackendError {
    match e {
        image::ImageError::IoError(io) => BackendError::Io(io),
        other => BackendError::ProcessingFailed(format!(
            "Failed to identify {}: {}",
            path.display(),
            other
        )),
    }
}

impl ConvertBackend for MagickBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if has_avif_brand(path)? {
            return identify_avif(path);
        }
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        if reader.format() == Some(ImageFormat::Avif) {
            return identify_avif(path);
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| identify_failed(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> ConvertStatus {
        let spawned = Command::new(&params.program)
            .args(params.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                log::warn!("could not start {}: {}", params.program.display(), e);
                return ConvertStatus::Failed { code: None };
            }
        };

        let waited = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout),
            None => child.wait().map(|status| status.code()),
        };

        match waited {
            Ok(code) => ConvertStatus::from_exit_code(code),
            Err(e) => {
                log::warn!("lost track of {}: {}", params.program.display(), e);
                ConvertStatus::Failed { code: None }
            }
        }
    }
}
