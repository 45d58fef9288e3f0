//! Image geometry: `WxH` descriptors and the scale/crop plan between two of them.
//!
//! A [`Geometry`] is either *measured* from an existing image
//! ([`Geometry::from_file`]) or *parsed* from a descriptor string in
//! ImageMagick's geometry syntax ([`Geometry::parse`]):
//!
//! ```text
//! "100x100"    → 100 × 100, no modifier
//! "100x100#"   → 100 × 100, crop modifier
//! "200x"       → width 200, height unconstrained
//! "x50>"       → height 50, shrink-only modifier
//! ```
//!
//! The pixel arithmetic behind [`Geometry::transformation_to`] lives in
//! [`imaging::calculations`](crate::imaging) so it can be tested without
//! any geometry parsing.

use crate::imaging::calculations::{crop_rectangle, scale_for_cover};
use crate::imaging::{BackendError, ConvertBackend};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{0} is not a valid geometry")]
    Invalid(String),
    #[error("cannot plan a crop from a {0} source")]
    Degenerate(Geometry),
}

/// Trailing flag of an ImageMagick geometry string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// `>`: only shrink larger images.
    Shrink,
    /// `<`: only enlarge smaller images.
    Enlarge,
    /// `#`: fill the box, then crop to it.
    Crop,
    /// `@`: treat width × height as a pixel-area limit.
    Area,
    /// `%`: dimensions are percentages.
    Percent,
    /// `^`: minimum dimensions (fill).
    Fill,
    /// `!`: ignore aspect ratio.
    Exact,
}

impl Modifier {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '>' => Self::Shrink,
            '<' => Self::Enlarge,
            '#' => Self::Crop,
            '@' => Self::Area,
            '%' => Self::Percent,
            '^' => Self::Fill,
            '!' => Self::Exact,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Shrink => '>',
            Self::Enlarge => '<',
            Self::Crop => '#',
            Self::Area => '@',
            Self::Percent => '%',
            Self::Fill => '^',
            Self::Exact => '!',
        }
    }
}

/// Width/height of an image, with an optional ImageMagick modifier.
///
/// A zero width or height means "unconstrained" for parsed geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Modifier>,
}

/// Scale and optional crop arguments for the external tool.
///
/// `crop` is `Some` only when the transformation was planned in crop mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transformation {
    pub scale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            modifier: None,
        }
    }

    /// Parse an ImageMagick-style geometry descriptor.
    ///
    /// At least one of width or height must be given. The `x` separator is
    /// required, so `"100"` is rejected.
    pub fn parse(descriptor: &str) -> Result<Self, GeometryError> {
        let invalid = || GeometryError::Invalid(descriptor.to_string());
        let trimmed = descriptor.trim();

        let (body, modifier) = match trimmed.chars().last().and_then(Modifier::from_char) {
            Some(m) => (&trimmed[..trimmed.len() - 1], Some(m)),
            None => (trimmed, None),
        };

        let (w, h) = body.split_once('x').ok_or_else(invalid)?;
        let width = parse_dimension(w).ok_or_else(invalid)?;
        let height = parse_dimension(h).ok_or_else(invalid)?;
        if width == 0 && height == 0 {
            return Err(invalid());
        }

        Ok(Self {
            width,
            height,
            modifier,
        })
    }

    /// Measure the geometry of an existing image.
    pub fn from_file(backend: &impl ConvertBackend, path: &Path) -> Result<Self, BackendError> {
        let dims = backend.identify(path)?;
        Ok(Self::new(dims.width, dims.height))
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn is_horizontal(&self) -> bool {
        self.height < self.width
    }

    pub fn is_vertical(&self) -> bool {
        self.width < self.height
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Plan how to turn an image of this geometry into `target`.
    ///
    /// Without `crop`, the target descriptor itself is the scale argument and
    /// ImageMagick does the fitting. With `crop`, the image is scaled so it
    /// covers the target box along its tighter axis, then the centered
    /// rectangle is cut out.
    pub fn transformation_to(
        &self,
        target: &Geometry,
        crop: bool,
    ) -> Result<Transformation, GeometryError> {
        if !crop {
            return Ok(Transformation {
                scale: target.to_string(),
                crop: None,
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(GeometryError::Degenerate(*self));
        }

        let source = (self.width, self.height);
        let box_size = (target.width, target.height);
        let (scale, factor) = scale_for_cover(source, box_size);
        let rect = crop_rectangle(source, box_size, factor);

        Ok(Transformation {
            scale,
            crop: Some(rect),
        })
    }
}

fn parse_dimension(s: &str) -> Option<u32> {
    if s.is_empty() {
        return Some(0);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for Geometry {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width > 0 {
            write!(f, "{}", self.width)?;
        }
        if self.height > 0 {
            write!(f, "x{}", self.height)?;
        }
        if let Some(m) = self.modifier {
            write!(f, "{}", m.as_char())?;
        }
        Ok(())
    }
}
