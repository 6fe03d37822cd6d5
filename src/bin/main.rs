use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use fileforge::{
    config::{Config, DEFAULT_FILES_PER_DIR, human_readable_size, parse_size},
    error::ConfigError,
    generator::{GenerationRequest, Generator},
    utils::{clamp_buffer_size, default_worker_count, optimal_buffer_size},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

const EXIT_FILES_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "fileforge", version)]
#[command(about = "FileForge - High Performance File Generator")]
struct Cli {
    /// Root directory where sub-directories and files will be created
    #[arg(long)]
    directory: PathBuf,

    /// Starting number of files (1-based, inclusive)
    #[arg(long)]
    start: u64,

    /// Ending number of files (inclusive)
    #[arg(long)]
    end: u64,

    /// Size of each file. Supported formats are B, KB, MB, GB (e.g., '1 GB')
    #[arg(long)]
    size: String,

    /// Number of files per subdirectory [default: 10000]
    #[arg(long)]
    files_per_dir: Option<u64>,

    /// Number of workers [default: number of CPUs + 1]
    #[arg(long)]
    workers: Option<usize>,

    /// Disable the creation of subdirectories
    #[arg(long)]
    no_subdirs: bool,

    /// TOML file with defaults (fileforge.toml is used if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not print the progress line or summary
    #[arg(short, long)]
    quiet: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let buffer_size = optimal_buffer_size();
    let command = Cli::command().after_help(format!(
        "Buffer Size: {} (auto-optimized)",
        human_readable_size(buffer_size as u64)
    ));
    let cli = match Cli::from_arg_matches(&command.get_matches()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let _log_guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error setting up logging: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let (request, show_progress) = match build_request(&cli, buffer_size) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("{}", e);
            error!("CLI | {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut generator = match Generator::new(request) {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if !show_progress {
        generator = generator.quiet();
    }

    let shutdown = generator.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C; finishing in-flight chunks and stopping...");
        shutdown.request();
    }) {
        warn!("CLI | could not install Ctrl+C handler: {}", e);
    }

    match generator.run() {
        Ok(summary) if summary.cancelled => ExitCode::from(EXIT_CANCELLED),
        Ok(summary) if summary.stats.failed > 0 => {
            error!(
                "CLI | {} of {} files failed",
                summary.stats.failed, summary.total_files
            );
            ExitCode::from(EXIT_FILES_FAILED)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Merges CLI flags over the config file over built-in defaults.
fn build_request(cli: &Cli, buffer_size: usize) -> Result<(GenerationRequest, bool), ConfigError> {
    let config = Config::load(cli.config.as_deref())?;

    let file_size = parse_size(&cli.size)?;
    if file_size <= 0 {
        return Err(ConfigError::NonPositiveSize(file_size));
    }

    let buffer_size_bytes = match config.buffer_size()? {
        Some(bytes) => clamp_buffer_size(usize::try_from(bytes).unwrap_or(usize::MAX)),
        None => buffer_size,
    };
    let worker_count = cli
        .workers
        .or(config.generation.workers)
        .unwrap_or_else(default_worker_count);
    let files_per_subdir = cli
        .files_per_dir
        .or(config.generation.files_per_dir)
        .unwrap_or(DEFAULT_FILES_PER_DIR);
    let show_progress = !cli.quiet && config.generation.progress.unwrap_or(true);

    info!(
        "CLI | buffer size {}, {} workers",
        human_readable_size(buffer_size_bytes as u64),
        worker_count
    );

    let request = GenerationRequest {
        root_directory: cli.directory.clone(),
        start_index: cli.start,
        end_index: cli.end,
        file_size_bytes: file_size as u64,
        files_per_subdir,
        use_subdirs: !cli.no_subdirs,
        worker_count,
        buffer_size_bytes,
    };
    Ok((request, show_progress))
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (writer, guard) = match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = fmt().with_env_filter(filter).with_writer(writer);
    let installed = match cli.log_format {
        LogFormat::Text => builder.with_ansi(cli.log_file.is_none()).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| e.to_string())?;
    Ok(guard)
}
