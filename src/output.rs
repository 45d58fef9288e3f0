//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Make
//!
//! ```text
//! 001 photo.jpg → /tmp/photo,4242,0.png
//! 002 scan.tiff → /tmp/scan,4242,1.png
//!     convert failed (exit 1), output may be incomplete
//! 003 notes.txt
//!     Error: Processing failed: Failed to identify notes.txt: ...
//! ```
//!
//! ## Plan
//!
//! ```text
//! photo.jpg
//!     Current: 800x600
//!     Target: 100x100# (crop)
//!     Scale: x100 → 133x100
//!     Crop: 100x100+16+0
//!     Command: convert "/photos/photo.jpg" -scale "x100" -crop "100x100+16+0" +repage "/tmp/photo,4242,0.png"
//! ```

use crate::imaging::{ConvertStatus, Dimensions};
use crate::thumbnail::{Plan, Thumbnail, ThumbnailError};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name for display, falling back to the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit {c}"),
        None => "did not run to completion".to_string(),
    }
}

fn format_dimensions(dims: Dimensions) -> String {
    format!("{}x{}", dims.width, dims.height)
}

// ============================================================================
// Make
// ============================================================================

/// Format the outcome of one `make` job.
pub fn format_make_result(
    index: usize,
    source: &Path,
    result: &Result<Thumbnail, ThumbnailError>,
) -> Vec<String> {
    let header = format!("{} {}", format_index(index), display_name(source));
    match result {
        Ok(thumb) => {
            let mut lines = vec![format!("{} \u{2192} {}", header, thumb.path.display())];
            if let ConvertStatus::Failed { code } = thumb.status {
                lines.push(format!(
                    "{}convert failed ({}), output may be incomplete",
                    indent(1),
                    describe_exit(code)
                ));
            }
            lines
        }
        Err(e) => {
            let mut lines = vec![header];
            match e {
                ThumbnailError::Conversion { output, code } => {
                    lines.push(format!("{}Error: {} ({})", indent(1), e, describe_exit(*code)));
                    lines.push(format!("{}Left behind: {}", indent(1), output.display()));
                }
                _ => lines.push(format!("{}Error: {}", indent(1), e)),
            }
            lines
        }
    }
}

/// Print the outcome of one `make` job to stdout.
pub fn print_make_result(
    index: usize,
    source: &Path,
    result: &Result<Thumbnail, ThumbnailError>,
) {
    for line in format_make_result(index, source, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Format a dry-run plan.
pub fn format_plan(plan: &Plan) -> Vec<String> {
    let mut lines = vec![
        display_name(&plan.source),
        format!(
            "{}Current: {}",
            indent(1),
            format_dimensions(Dimensions {
                width: plan.current.width,
                height: plan.current.height,
            })
        ),
    ];

    let mode = if plan.crop { "crop" } else { "scale" };
    lines.push(format!("{}Target: {} ({})", indent(1), plan.target, mode));

    match plan.intermediate {
        Some(dims) => lines.push(format!(
            "{}Scale: {} \u{2192} {}",
            indent(1),
            plan.transformation.scale,
            format_dimensions(dims)
        )),
        None => lines.push(format!("{}Scale: {}", indent(1), plan.transformation.scale)),
    }
    if let Some(crop) = &plan.transformation.crop {
        lines.push(format!("{}Crop: {}", indent(1), crop));
    }
    lines.push(format!("{}Command: {}", indent(1), plan.command));
    lines
}

/// Print a dry-run plan to stdout.
pub fn print_plan(plan: &Plan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Identify
// ============================================================================

/// Format one identify result: `photo.jpg 800x600`.
pub fn format_identify(source: &Path, dims: Dimensions) -> String {
    format!("{} {}", display_name(source), format_dimensions(dims))
}

// ============================================================================
// Tests
// ============================================================================
