use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thumbnailer::config::{self, Config};
use thumbnailer::imaging::{ConvertBackend, MagickBackend};
use thumbnailer::naming::TempNamer;
use thumbnailer::output;
use thumbnailer::thumbnail::{CONVERT_COMMAND, ThumbnailJob, ThumbnailOptions};

#[derive(Parser)]
#[command(name = "thumbnailer")]
#[command(about = "Make thumbnails with ImageMagick")]
#[command(long_about = "\
Make thumbnails with ImageMagick

Reads each source's dimensions, works out a scale (and, for geometries ending
in '#', a centered crop), and runs `convert` to write the result into the temp
directory as <name>,<pid>,<n>[.format].

Geometry examples:

  100x100#    scale to cover 100x100, then crop to exactly 100x100
  200x200     scale to fit 200x200, keep the aspect ratio
  x64         scale to 64 pixels high

Settings are read from ./thumbnailer.toml (or --config FILE) and overridden by
flags. Run 'thumbnailer gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./thumbnailer.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the `[thumbnail]` config table.
#[derive(clap::Args, Clone)]
struct JobArgs {
    /// Target geometry, e.g. 100x100#
    #[arg(long)]
    dimensions: Option<String>,

    /// Output extension, e.g. png
    #[arg(long)]
    format: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Make a thumbnail for each source
    Make {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        #[command(flatten)]
        job: JobArgs,

        /// Keep outputs of failed conversions instead of erroring
        #[arg(long)]
        lenient: bool,
    },
    /// Show what `make` would do without running ImageMagick
    Plan {
        source: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the dimensions of each source
    Identify {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
    /// Print a stock thumbnailer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Make {
            sources,
            job,
            lenient,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            let backend = MagickBackend::with_timeout(config.timeout());
            let names = TempNamer::new(config.tmp_dir());
            init_thread_pool(&config.processing);
            let mut options = job_options(&config, &job);
            if lenient {
                options = options.whiny(false);
            }
            let program = config.path_for_command(CONVERT_COMMAND);

            let results: Vec<_> = sources
                .par_iter()
                .map(|source| {
                    ThumbnailJob::new(&backend, source, options.clone())
                        .with_program(&program)
                        .make(&names)
                })
                .collect();

            let mut failed = 0;
            for (i, (source, result)) in sources.iter().zip(&results).enumerate() {
                output::print_make_result(i + 1, source, result);
                if result.is_err() {
                    failed += 1;
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} thumbnails failed", sources.len()).into());
            }
        }
        Command::Plan { source, job, json } => {
            let config = resolve_config(cli.config.as_deref())?;
            let backend = MagickBackend::with_timeout(config.timeout());
            let names = TempNamer::new(config.tmp_dir());
            let job = ThumbnailJob::new(&backend, &source, job_options(&config, &job))
                .with_program(config.path_for_command(CONVERT_COMMAND));
            let plan = job.plan(&names)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                output::print_plan(&plan);
            }
        }
        Command::Identify { sources } => {
            let backend = MagickBackend::new();
            for source in &sources {
                let dims = backend.identify(source)?;
                println!("{}", output::format_identify(source, dims));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config FILE`, or `thumbnailer.toml` from the working directory.
fn resolve_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&std::env::current_dir()?)?,
    };
    log::debug!("resolved config: {config:?}");
    Ok(config)
}

/// Apply CLI overrides to the configured job options.
fn job_options(config: &Config, args: &JobArgs) -> ThumbnailOptions {
    let mut options = config.thumbnail.clone();
    if let Some(dimensions) = &args.dimensions {
        options.dimensions = dimensions.clone();
    }
    if let Some(format) = &args.format {
        options = options.format(format.trim_start_matches('.'));
    }
    options
}

/// Default filter is `warn`; each `-v` raises it one level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
