//! End-to-end `make()` runs against the real [`MagickBackend`], with small
//! shell scripts standing in for ImageMagick's `convert`.
//!
//! Sources are real JPEGs so identify goes through the `image` crate.

#![cfg(unix)]

use image::{ImageEncoder, RgbImage};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use thumbnailer::imaging::{ConvertStatus, MagickBackend};
use thumbnailer::naming::TempNamer;
use thumbnailer::thumbnail::{ThumbnailError, ThumbnailJob, ThumbnailOptions};

/// Writes its argument list to `<output>.args`, then some bytes to `<output>`.
///
/// Every stub exits 0 when called with just `ready`; see [`write_script`].
const RECORDING_CONVERT: &str = r#"#!/bin/sh
[ "$1" = ready ] && exit 0
for last; do :; done
printf '%s\n' "$@" > "$last.args"
printf 'thumbnail' > "$last"
"#;

const FAILING_CONVERT: &str = "#!/bin/sh\n[ \"$1\" = ready ] && exit 0\nexit 1\n";

struct Stubs {
    _dir: TempDir,
    recording: PathBuf,
    failing: PathBuf,
}

/// Scripts are written once and are runnable before any test uses them.
fn stubs() -> &'static Stubs {
    static STUBS: OnceLock<Stubs> = OnceLock::new();
    STUBS.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let recording = write_script(dir.path(), "convert", RECORDING_CONVERT);
        let failing = write_script(dir.path(), "convert-fail", FAILING_CONVERT);
        Stubs {
            _dir: dir,
            recording,
            failing,
        }
    })
}

/// Write an executable stub and wait until exec stops failing with ETXTBSY.
///
/// A process forked by another test thread can briefly hold the script's
/// write handle; once one run succeeds, no writer is left.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    for _ in 0..200 {
        match Command::new(&path).arg("ready").status() {
            Ok(status) => {
                assert!(status.success(), "{name} did not accept `ready`");
                return path;
            }
            Err(e) if e.raw_os_error() == Some(26) => {
                std::thread::sleep(Duration::from_millis(10))
            }
            Err(e) => panic!("cannot run {}: {e}", path.display()),
        }
    }
    panic!("{} stayed busy", path.display());
}

fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    let file = std::fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

fn recorded_args(output: &Path) -> Vec<String> {
    let mut args_path = output.as_os_str().to_owned();
    args_path.push(".args");
    std::fs::read_to_string(PathBuf::from(args_path))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =========================================================================
// Success
// =========================================================================

#[test]
fn crop_thumbnail_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    create_test_jpeg(&source, 800, 600);
    let out_dir = tmp.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let backend = MagickBackend::new();
    let names = TempNamer::with_pid(&out_dir, 31337);
    let job = ThumbnailJob::new(
        &backend,
        &source,
        ThumbnailOptions::new("100x100#").format("png"),
    )
    .with_program(&stubs().recording);

    let thumb = job.make(&names).unwrap();
    assert_eq!(thumb.path, out_dir.join("photo,31337,0.png"));
    assert_eq!(thumb.status, ConvertStatus::Success);
    assert_eq!(std::fs::read(&thumb.path).unwrap(), b"thumbnail");

    assert_eq!(
        recorded_args(&thumb.path),
        vec![
            source.to_string_lossy().into_owned(),
            "-scale".into(),
            "x100".into(),
            "-crop".into(),
            "100x100+16+0".into(),
            "+repage".into(),
            thumb.path.to_string_lossy().into_owned(),
        ]
    );
}

#[test]
fn scale_thumbnail_without_format() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("tall.jpg");
    create_test_jpeg(&source, 300, 600);

    let backend = MagickBackend::new();
    let names = TempNamer::with_pid(tmp.path(), 7);
    let job = ThumbnailJob::new(&backend, &source, ThumbnailOptions::new("200x200"))
        .with_program(&stubs().recording);

    let thumb = job.make(&names).unwrap();
    assert_eq!(thumb.path, tmp.path().join("tall,7,0"));

    let args = recorded_args(&thumb.path);
    assert_eq!(args[1..3], ["-scale".to_string(), "200x200".to_string()]);
    assert_eq!(args.len(), 4);
}

#[test]
fn extensionless_upload_is_identified_by_content() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("RackMultipart20240101-1234-abc");
    create_test_jpeg(&source, 800, 600);

    let backend = MagickBackend::new();
    let job = ThumbnailJob::new(
        &backend,
        &source,
        ThumbnailOptions::new("100x100#").format("jpg"),
    )
    .with_program(&stubs().recording);

    let thumb = job.make(&TempNamer::with_pid(tmp.path(), 2)).unwrap();
    assert_eq!(
        thumb.path,
        tmp.path().join("RackMultipart20240101-1234-abc,2,0.jpg")
    );
    assert_eq!(recorded_args(&thumb.path)[2], "x100");
}

#[test]
fn repeated_jobs_get_distinct_outputs() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    create_test_jpeg(&source, 64, 48);

    let backend = MagickBackend::new();
    let names = TempNamer::new(tmp.path());
    let job = ThumbnailJob::new(&backend, &source, ThumbnailOptions::new("32x32#").format("jpg"))
        .with_program(&stubs().recording);

    let first = job.make(&names).unwrap();
    let second = job.make(&names).unwrap();
    assert_ne!(first.path, second.path);
    assert!(first.path.exists() && second.path.exists());
}

// =========================================================================
// Failure
// =========================================================================

#[test]
fn strict_failure_reports_and_leaves_file() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    create_test_jpeg(&source, 80, 60);

    let backend = MagickBackend::new();
    let job = ThumbnailJob::new(&backend, &source, ThumbnailOptions::new("10x10#"))
        .with_program(&stubs().failing);

    let err = job.make(&TempNamer::new(tmp.path())).unwrap_err();
    assert_eq!(err.to_string(), "There was an error processing this thumbnail");
    let ThumbnailError::Conversion { output, code } = err else {
        panic!("expected a conversion error");
    };
    assert_eq!(code, Some(1));
    assert!(output.exists());
}

#[test]
fn lenient_failure_returns_output() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    create_test_jpeg(&source, 80, 60);

    let backend = MagickBackend::new();
    let job = ThumbnailJob::new(
        &backend,
        &source,
        ThumbnailOptions::new("10x10#").whiny(false),
    )
    .with_program(&stubs().failing);

    let thumb = job.make(&TempNamer::new(tmp.path())).unwrap();
    assert!(!thumb.is_complete());
    assert_eq!(std::fs::metadata(&thumb.path).unwrap().len(), 0);
}

#[test]
fn missing_convert_is_a_failure() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    create_test_jpeg(&source, 80, 60);

    let backend = MagickBackend::new();
    let job = ThumbnailJob::new(&backend, &source, ThumbnailOptions::new("10x10"))
        .with_program(tmp.path().join("no-such-convert"));

    let err = job.make(&TempNamer::new(tmp.path())).unwrap_err();
    assert!(matches!(err, ThumbnailError::Conversion { code: None, .. }));
}

#[test]
fn unreadable_source_never_runs_convert() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("notes.txt");
    std::fs::write(&source, "not an image").unwrap();

    let backend = MagickBackend::new();
    let job = ThumbnailJob::new(&backend, &source, ThumbnailOptions::new("10x10"))
        .with_program(&stubs().recording);

    let err = job.make(&TempNamer::with_pid(tmp.path(), 1)).unwrap_err();
    assert!(matches!(err, ThumbnailError::Backend(_)));
    assert!(!tmp.path().join("notes,1,0.args").exists());
}
