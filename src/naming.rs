//! Temp-file naming for conversion outputs.
//!
//! ImageMagick picks the output codec from the destination's extension, so a
//! temp name like `photo.png,1234,0` would make it write the wrong format.
//! Names here keep the extension last:
//!
//! ```text
//! "photo.png" → photo,<pid>,<n>.png
//! "photo"     → photo,<pid>,<n>
//! ```
//!
//! Uniqueness comes from the process id plus a per-[`TempNamer`] counter.
//! The file is created with `create_new`, and on a name collision (another
//! process, a stale file, a second namer in the same process) the counter is
//! bumped and creation retried.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Give up after this many consecutive collisions.
const MAX_ATTEMPTS: u32 = 1000;

/// Build `<stem>,<pid>,<n><ext>` from a requested base name.
///
/// The extension (with its dot) is taken from `basename` and moved to the end.
/// A name without an extension gets none.
///
/// - `("photo.png", 42, 7)` → `"photo,42,7.png"`
/// - `("photo", 42, 7)` → `"photo,42,7"`
/// - `("archive.tar.gz", 42, 7)` → `"archive.tar,42,7.gz"`
pub fn make_tmpname(basename: &str, pid: u32, n: u64) -> String {
    let (stem, extension) = split_extension(basename);
    tmpname_from_parts(stem, extension, pid, n)
}

/// Build `<stem>,<pid>,<n><extension>`; `extension` is either empty or starts
/// with a dot.
fn tmpname_from_parts(stem: &str, extension: &str, pid: u32, n: u64) -> String {
    format!("{stem},{pid},{n}{extension}")
}

/// Split `"name.ext"` into `("name", ".ext")`. Leading-dot names like
/// `".profile"` have no extension.
fn split_extension(basename: &str) -> (&str, &str) {
    match basename.rfind('.') {
        Some(0) | None => (basename, ""),
        Some(i) if i + 1 == basename.len() => (basename, ""),
        Some(i) => basename.split_at(i),
    }
}

/// A created temp file. Not removed on drop: the caller owns it.
#[derive(Debug)]
pub struct TempArtifact {
    pub path: PathBuf,
    pub file: File,
}

/// Allocates uniquely named temp files in one directory.
///
/// The counter is shared by every job using this namer, so concurrent jobs
/// in one process never race for the same name.
#[derive(Debug)]
pub struct TempNamer {
    dir: PathBuf,
    pid: u32,
    counter: AtomicU64,
}

impl TempNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_pid(dir, std::process::id())
    }

    pub fn with_pid(dir: impl Into<PathBuf>, pid: u32) -> Self {
        Self {
            dir: dir.into(),
            pid,
            counter: AtomicU64::new(0),
        }
    }

    /// Reserve the next name for `basename` without touching the disk.
    pub fn next_name(&self, basename: &str) -> String {
        let (stem, extension) = split_extension(basename);
        self.next_name_from_parts(stem, extension)
    }

    fn next_name_from_parts(&self, stem: &str, extension: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        tmpname_from_parts(stem, extension, self.pid, n)
    }

    /// Path the next `create_parts(stem, extension)` would try, without
    /// reserving it.
    pub fn preview_parts(&self, stem: &str, extension: &str) -> PathBuf {
        let n = self.counter.load(Ordering::Relaxed);
        self.dir.join(tmpname_from_parts(stem, extension, self.pid, n))
    }

    /// Create a new, empty file for `basename`, opened for read and write.
    pub fn create(&self, basename: &str) -> io::Result<TempArtifact> {
        let (stem, extension) = split_extension(basename);
        self.create_parts(stem, extension)
    }

    /// Like [`create`](Self::create) with the stem and extension given
    /// separately, so dots inside `stem` are never read as an extension.
    ///
    /// `extension` is either empty or starts with a dot.
    pub fn create_parts(&self, stem: &str, extension: &str) -> io::Result<TempArtifact> {
        for _ in 0..MAX_ATTEMPTS {
            let path = self.dir.join(self.next_name_from_parts(stem, extension));
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => return Ok(TempArtifact { path, file }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free temp name for {stem}{extension} in {} after {MAX_ATTEMPTS} attempts",
                self.dir.display()
            ),
        ))
    }
}
