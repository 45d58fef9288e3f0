//! # Thumbnailer
//!
//! Plans thumbnail geometry in Rust and hands the pixels to ImageMagick.
//!
//! A thumbnail job takes one source image and a target geometry such as
//! `"100x100#"`, reads the source's dimensions, decides how to scale (and,
//! for a trailing `#`, where to crop), and runs one `convert` process that
//! writes into a fresh, uniquely named temp file:
//!
//! ```text
//! photo.jpg (800x600) + "100x100#"
//!   → convert /abs/photo.jpg -scale x100 -crop 100x100+16+0 +repage /tmp/photo,<pid>,0.png
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | `WxH[modifier]` descriptors, orientation, scale/crop planning |
//! | [`imaging`] | Identify backend, `convert` argument list, process execution |
//! | [`naming`] | Collision-free temp names that keep the extension last |
//! | [`thumbnail`] | The job: memoized geometries, failure policy, dry-run plans |
//! | [`config`] | `thumbnailer.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Arguments, Not Shell Strings
//!
//! `convert` is spawned directly with a structured argument list. Paths with
//! spaces or quotes need no escaping and nothing is ever parsed by a shell.
//! [`imaging::ConvertParams::command_line`] renders a quoted form for logs
//! and dry runs only.
//!
//! ## Identify In-Process
//!
//! Source dimensions come from reading the image header with the `image`
//! crate (and `avif-parse` for AVIF) rather than a second ImageMagick call.
//! The [`imaging::ConvertBackend`] trait keeps both halves swappable, and the
//! tests use a recording mock so no test depends on ImageMagick.
//!
//! ## Outputs Belong to the Caller
//!
//! The output file is created empty before `convert` runs and is never
//! deleted by this crate, not even when the conversion fails. A strict
//! failure carries the path in the error so the caller can decide.

pub mod config;
pub mod geometry;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod thumbnail;
