//! Image processing. Identify in-process, convert through ImageMagick.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, `avif-parse` for AVIF |
//! | **Plan** | pure scale/crop math in [`calculations`] |
//! | **Convert** | `convert src -scale S [-crop C +repage] dst` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for scale/crop math (unit testable)
//! - **Parameters**: The structured `convert` argument list
//! - **Backend**: [`ConvertBackend`] trait + [`MagickBackend`]
//! - **Operations**: Crop detection, planning, and running a conversion

pub mod backend;
pub mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;

pub use backend::{BackendError, ConvertBackend, ConvertStatus, Dimensions};
pub use magick_backend::MagickBackend;
pub use operations::{CROP_MARKER, is_crop, plan_convert, plan_transformation, run_convert};
pub use params::ConvertParams;
