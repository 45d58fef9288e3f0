//! Thumbnailer configuration.
//!
//! Handles loading, validating, and merging `thumbnailer.toml`. Stock
//! defaults are the base layer; a user file only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # tmp_dir = "/var/tmp/thumbs"   # Where outputs are created (default: system temp dir)
//!
//! [image_magick]
//! # path = "/usr/local/bin"       # Directory holding `convert` (default: PATH lookup)
//! # timeout_secs = 30             # Kill a conversion after this long (default: wait forever)
//!
//! [thumbnail]
//! dimensions = "100x100#"         # Target geometry; trailing '#' crops to exact size
//! # format = "png"                # Output extension (default: none)
//! whiny_thumbnails = true         # Fail when `convert` exits nonzero
//!
//! [processing]
//! # max_processes = 4             # Parallel jobs (default: CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::geometry::Geometry;
use crate::thumbnail::ThumbnailOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILENAME: &str = "thumbnailer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `thumbnailer.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory for output files. `None` → the system temp directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,
    /// Where to find ImageMagick and how long to let it run.
    pub image_magick: ImageMagickConfig,
    /// Default job options; CLI flags override them.
    pub thumbnail: ThumbnailOptions,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmp_dir: None,
            image_magick: ImageMagickConfig::default(),
            thumbnail: ThumbnailOptions::new("100x100#"),
            processing: ProcessingConfig::default(),
        }
    }
}

/// ImageMagick location and limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageMagickConfig {
    /// Directory containing the ImageMagick binaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Seconds before a running conversion is killed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail jobs.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Geometry::parse(&self.thumbnail.dimensions).map_err(|e| {
            ConfigError::Validation(format!("thumbnail.dimensions: {e}"))
        })?;
        if let Some(format) = &self.thumbnail.format {
            if format.is_empty() || format.starts_with('.') || format.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "thumbnail.format must be a bare extension like \"png\", got {format:?}"
                )));
            }
        }
        if self.image_magick.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "image_magick.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the path of an ImageMagick command.
    ///
    /// `image_magick.path` joined with `command` when configured, otherwise
    /// the bare command name for a `PATH` lookup.
    pub fn path_for_command(&self, command: &str) -> PathBuf {
        match &self.image_magick.path {
            Some(dir) => dir.join(command),
            None => PathBuf::from(command),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.image_magick.timeout_secs.map(Duration::from_secs)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `thumbnailer.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILENAME))
}

/// Like [`load_config`], for an explicit file path.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `thumbnailer.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Thumbnailer Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory where thumbnails are created. Defaults to the system temp dir.
# Output files are named <source-name>,<pid>,<n>[.format] and are never
# deleted by thumbnailer.
# tmp_dir = "/var/tmp/thumbnails"

# ---------------------------------------------------------------------------
# ImageMagick
# ---------------------------------------------------------------------------
[image_magick]
# Directory containing the `convert` binary. When omitted, `convert` is
# looked up on PATH.
# path = "/usr/local/bin"

# Kill a conversion that runs longer than this many seconds. When omitted,
# thumbnailer waits for ImageMagick indefinitely.
# timeout_secs = 30

# ---------------------------------------------------------------------------
# Thumbnail defaults (overridden by --dimensions, --format, --lenient)
# ---------------------------------------------------------------------------
[thumbnail]
# Target geometry in ImageMagick syntax. A trailing '#' scales the image to
# cover the box and crops the overflow, giving exactly these dimensions.
# Without it the image is scaled to fit ("200x200", "200x200>", "x100").
dimensions = "100x100#"

# Output file extension, which also selects the output format.
# When omitted the output file has no extension.
# format = "png"

# When true, a failing `convert` is an error. When false, the (possibly
# empty or broken) output file is returned anyway.
whiny_thumbnails = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel jobs when several sources are given. Defaults to the
# number of CPU cores; larger values are clamped down.
# max_processes = 4
"##
}
