//! Thumbnail jobs: one source image, one target, one `convert` run.
//!
//! A [`ThumbnailJob`] owns the decision of *how* to transform (crop or pure
//! scale, and the exact arguments) and the lifecycle of the output file. The
//! pixels are ImageMagick's business.
//!
//! ## Pipeline
//!
//! ```text
//! make()
//!   ├─ allocate <base>,<pid>,<n>[.format] in the temp dir
//!   ├─ current geometry (identify, once)   ─┐
//!   ├─ target geometry (parse, once)        ├─ plan scale [+ crop]
//!   ├─ crop? (raw dimensions end in '#')   ─┘
//!   ├─ convert src -scale S [-crop C +repage] dst
//!   └─ exit status → FailurePolicy → Thumbnail | ThumbnailError::Conversion
//! ```
//!
//! There is no retry. A failed conversion is final for that `make()` call, and
//! under [`FailurePolicy::Strict`] the half-written output is left on disk;
//! its path travels in the error so callers can remove it.

use crate::geometry::{Geometry, GeometryError, Transformation};
use crate::imaging::calculations::calculate_fill_dimensions;
use crate::imaging::{
    BackendError, ConvertBackend, ConvertStatus, Dimensions, is_crop, plan_convert,
    plan_transformation, run_convert,
};
use crate::naming::TempNamer;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Program name handed to the tool-path resolver.
pub const CONVERT_COMMAND: &str = "convert";

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("There was an error processing this thumbnail")]
    Conversion { output: PathBuf, code: Option<i32> },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-job options.
///
/// Deserializes from the `[thumbnail]` config table; every key but
/// `dimensions` may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailOptions {
    /// Target geometry, e.g. `"100x100#"`. A trailing `#` selects crop mode.
    pub dimensions: String,
    /// Output extension without the dot. Omitted → the output has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Fail on a nonzero exit from `convert`. Defaults to true.
    #[serde(default = "default_whiny")]
    pub whiny_thumbnails: bool,
}

fn default_whiny() -> bool {
    true
}

impl ThumbnailOptions {
    pub fn new(dimensions: impl Into<String>) -> Self {
        Self {
            dimensions: dimensions.into(),
            format: None,
            whiny_thumbnails: true,
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn whiny(mut self, whiny: bool) -> Self {
        self.whiny_thumbnails = whiny;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.whiny_thumbnails {
            FailurePolicy::Strict
        } else {
            FailurePolicy::Lenient
        }
    }
}

/// What `make()` does when `convert` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return [`ThumbnailError::Conversion`].
    Strict,
    /// Return the output anyway, with the failure recorded in
    /// [`Thumbnail::status`]. The file may be empty or corrupt.
    Lenient,
}

/// The produced output file. Nothing deletes it; it belongs to the caller.
#[derive(Debug)]
pub struct Thumbnail {
    pub path: PathBuf,
    /// Handle opened before the conversion ran. Seek before reading.
    pub file: File,
    pub status: ConvertStatus,
}

impl Thumbnail {
    /// False only for lenient jobs whose conversion failed.
    pub fn is_complete(&self) -> bool {
        self.status.is_success()
    }
}

/// Everything `make()` would do, computed without running anything.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub source: PathBuf,
    pub current: Geometry,
    pub target: Geometry,
    pub crop: bool,
    pub transformation: Transformation,
    /// Size after `-scale`, before `-crop`. Only in crop mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<Dimensions>,
    pub command: String,
}

/// One thumbnail conversion of one source file.
pub struct ThumbnailJob<'a, B: ConvertBackend> {
    backend: &'a B,
    source: PathBuf,
    options: ThumbnailOptions,
    program: PathBuf,
    base_name: String,
    current_geometry: OnceCell<Geometry>,
    target_geometry: OnceCell<Geometry>,
}

impl<'a, B: ConvertBackend> ThumbnailJob<'a, B> {
    pub fn new(backend: &'a B, source: impl Into<PathBuf>, options: ThumbnailOptions) -> Self {
        let source = source.into();
        let base_name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "thumbnail".to_string());

        Self {
            backend,
            source,
            options,
            program: PathBuf::from(CONVERT_COMMAND),
            base_name,
            current_geometry: OnceCell::new(),
            target_geometry: OnceCell::new(),
        }
    }

    /// Use `program` instead of `convert` from `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn options(&self) -> &ThumbnailOptions {
        &self.options
    }

    /// Source file name without its extension.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Requested output extension, possibly empty.
    pub fn extension(&self) -> &str {
        self.options.format.as_deref().unwrap_or("")
    }

    /// Extension as it appears in the output file name: `".png"` or `""`.
    fn dotted_extension(&self) -> String {
        match self.extension() {
            "" => String::new(),
            ext => format!(".{ext}"),
        }
    }

    /// True iff the raw `dimensions` option ends in `#`.
    pub fn is_crop(&self) -> bool {
        is_crop(&self.options.dimensions)
    }

    /// Geometry of the source image, identified on first use.
    ///
    /// A failed identify is not cached; the next call tries again.
    pub fn current_geometry(&self) -> Result<Geometry, BackendError> {
        if let Some(g) = self.current_geometry.get() {
            return Ok(*g);
        }
        let g = Geometry::from_file(self.backend, &self.source)?;
        Ok(*self.current_geometry.get_or_init(|| g))
    }

    /// Geometry parsed from `dimensions`, on first use.
    pub fn target_geometry(&self) -> Result<Geometry, GeometryError> {
        if let Some(g) = self.target_geometry.get() {
            return Ok(*g);
        }
        let g = Geometry::parse(&self.options.dimensions)?;
        Ok(*self.target_geometry.get_or_init(|| g))
    }

    /// Scale and optional crop arguments for this job.
    pub fn transformation(&self) -> Result<Transformation, ThumbnailError> {
        let current = self.current_geometry()?;
        let target = self.target_geometry()?;
        Ok(plan_transformation(&current, &target, self.is_crop())?)
    }

    /// Dry run: the geometries and the command `make()` would use.
    ///
    /// Nothing is created or spawned. The output path is the name `names`
    /// would hand out next, which a concurrent job may still take first.
    pub fn plan(&self, names: &TempNamer) -> Result<Plan, ThumbnailError> {
        let current = self.current_geometry()?;
        let target = self.target_geometry()?;
        let crop = self.is_crop();
        let transformation = plan_transformation(&current, &target, crop)?;

        let intermediate = crop.then(|| {
            let (width, height) = calculate_fill_dimensions(
                (current.width, current.height),
                (target.width, target.height),
            );
            Dimensions { width, height }
        });

        let params = plan_convert(
            self.program.clone(),
            &self.source,
            &names.preview_parts(&self.base_name, &self.dotted_extension()),
            transformation.clone(),
        )?;

        Ok(Plan {
            source: params.source.clone(),
            current,
            target,
            crop,
            transformation,
            intermediate,
            command: params.command_line(),
        })
    }

    /// Run the conversion and hand back the output file.
    pub fn make(&self, names: &TempNamer) -> Result<Thumbnail, ThumbnailError> {
        let dst = names.create_parts(&self.base_name, &self.dotted_extension())?;
        log::debug!(
            "thumbnail for {} goes to {}",
            self.source.display(),
            dst.path.display()
        );

        let transformation = self.transformation()?;
        let params = plan_convert(
            self.program.clone(),
            &self.source,
            &dst.path,
            transformation,
        )?;
        let status = run_convert(self.backend, &params);

        if let ConvertStatus::Failed { code } = status {
            match self.options.failure_policy() {
                FailurePolicy::Strict => {
                    return Err(ThumbnailError::Conversion {
                        output: dst.path,
                        code,
                    });
                }
                FailurePolicy::Lenient => log::warn!(
                    "ignoring failed conversion of {} (exit {:?}), output may be incomplete",
                    self.source.display(),
                    code
                ),
            }
        }

        Ok(Thumbnail {
            path: dst.path,
            file: dst.file,
            status,
        })
    }
}
