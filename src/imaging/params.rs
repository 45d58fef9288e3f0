//! Parameter types for the external conversion.
//!
//! [`ConvertParams`] describes *what* `convert` should do, not *how* it gets
//! run. It is the interface between the [`operations`](super::operations)
//! module (which decides scale and crop) and the [`backend`](super::backend)
//! (which spawns the process), so a mock backend can assert on the exact
//! argument list without running ImageMagick.
//!
//! Arguments are kept as a discrete list and handed straight to the process
//! spawner. There is no shell in between, so paths with spaces or quotes
//! need no escaping.

use std::ffi::OsString;
use std::path::PathBuf;

/// Full specification of one `convert` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    /// Tool to run, as resolved by [`Config::path_for_command`](crate::config::Config::path_for_command).
    pub program: PathBuf,
    /// Absolute path of the source image.
    pub source: PathBuf,
    /// Absolute path the tool writes to.
    pub output: PathBuf,
    /// `-scale` geometry.
    pub scale: String,
    /// `-crop` geometry; present only in crop mode.
    pub crop: Option<String>,
}

impl ConvertParams {
    /// Arguments after the program name, in invocation order.
    ///
    /// `src -scale S [-crop C +repage] dst`. `+repage` drops the virtual
    /// canvas offset `-crop` leaves behind.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.source.clone().into_os_string(),
            "-scale".into(),
            self.scale.clone().into(),
        ];
        if let Some(crop) = &self.crop {
            args.push("-crop".into());
            args.push(crop.into());
            args.push("+repage".into());
        }
        args.push(self.output.clone().into_os_string());
        args
    }

    /// Single-line rendering in shell syntax, for logs and `plan` output.
    ///
    /// Never executed; [`args`](Self::args) is what gets spawned.
    pub fn command_line(&self) -> String {
        let mut line = format!(
            "{} \"{}\" -scale \"{}\"",
            self.program.display(),
            self.source.display(),
            self.scale
        );
        if let Some(crop) = &self.crop {
            line.push_str(&format!(" -crop \"{}\" +repage", crop));
        }
        line.push_str(&format!(" \"{}\"", self.output.display()));
        line
    }
}
