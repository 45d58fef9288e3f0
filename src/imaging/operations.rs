//! High-level image operations.
//!
//! These functions combine geometry planning with backend execution: decide
//! between crop and pure scale, turn the decision into a [`ConvertParams`],
//! and hand it to the backend.

use super::backend::{ConvertBackend, ConvertStatus};
use super::params::ConvertParams;
use crate::geometry::{Geometry, GeometryError, Transformation};
use std::io;
use std::path::{Path, PathBuf};

/// Marker that switches a dimensions descriptor into crop mode.
pub const CROP_MARKER: char = '#';

/// True iff the raw dimensions descriptor ends in `#`.
///
/// Checked on the string rather than on a parsed [`Geometry`]: the parser
/// folds the marker into a modifier, and the descriptor is the source of truth.
pub fn is_crop(dimensions: &str) -> bool {
    dimensions.ends_with(CROP_MARKER)
}

/// Decide the scale and crop arguments for turning `current` into `target`.
///
/// The crop argument is present exactly when `crop` is set.
pub fn plan_transformation(
    current: &Geometry,
    target: &Geometry,
    crop: bool,
) -> Result<Transformation, GeometryError> {
    current.transformation_to(target, crop)
}

/// Build the conversion for a planned transformation.
///
/// Source and output are made absolute so the tool does not depend on the
/// caller's working directory.
pub fn plan_convert(
    program: PathBuf,
    source: &Path,
    output: &Path,
    transformation: Transformation,
) -> io::Result<ConvertParams> {
    Ok(ConvertParams {
        program,
        source: std::path::absolute(source)?,
        output: std::path::absolute(output)?,
        scale: transformation.scale,
        crop: transformation.crop,
    })
}

/// Run one conversion through the backend.
pub fn run_convert(backend: &impl ConvertBackend, params: &ConvertParams) -> ConvertStatus {
    log::debug!("running {}", params.command_line());
    let status = backend.convert(params);
    log::debug!("{} finished: {:?}", params.program.display(), status);
    status
}
