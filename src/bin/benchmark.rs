use clap::Parser;
use fileforge::{
    config::{DEFAULT_FILES_PER_DIR, human_readable_size, parse_size},
    generator::{GenerationRequest, Generator},
    utils::{default_worker_count, optimal_buffer_size, page_size},
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::System;
use tempfile::TempDir;

#[derive(Parser)]
#[command(name = "benchmark")]
#[command(about = "measure generation throughput across worker counts")]
struct Args {
    /// Size of each generated file
    #[arg(long, default_value = "8 MB")]
    size: String,

    /// Files generated per run
    #[arg(long, default_value_t = 32)]
    files: u64,

    /// Runs per worker count
    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Worker counts to compare [default: 1, 2 and CPUs + 1]
    #[arg(long, value_delimiter = ',')]
    workers: Vec<usize>,

    /// Scratch directory on the disk under test [default: system temp dir]
    #[arg(long)]
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct BenchmarkResult {
    run_number: usize,
    duration: Duration,
    throughput_mbs: f64,
    failed: u64,
}

#[derive(Debug)]
struct SystemInfo {
    cpu_name: String,
    cpu_cores: usize,
    total_memory_gb: f64,
    available_memory_gb: f64,
    page_size: usize,
}

/// Collects a snapshot of the host machine's CPU and memory using the
/// [`sysinfo`] crate.
fn get_system_info() -> SystemInfo {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu_name = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_else(|| "Unknown CPU".to_string());

    SystemInfo {
        cpu_name,
        cpu_cores: sys.cpus().len(),
        total_memory_gb: sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
        available_memory_gb: sys.available_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
        page_size: page_size(),
    }
}

/// Generates `files` files into a fresh scratch directory under `parent` and
/// times the whole run. The scratch directory is removed afterwards.
fn run_single_benchmark(
    run_number: usize,
    parent: &Path,
    workers: usize,
    files: u64,
    file_size: u64,
) -> Result<BenchmarkResult, Box<dyn std::error::Error>> {
    let scratch = TempDir::new_in(parent)?;
    let generator = Generator::new(GenerationRequest {
        root_directory: scratch.path().to_path_buf(),
        start_index: 1,
        end_index: files,
        file_size_bytes: file_size,
        files_per_subdir: DEFAULT_FILES_PER_DIR,
        use_subdirs: false,
        worker_count: workers,
        buffer_size_bytes: optimal_buffer_size(),
    })?
    .quiet();

    let summary = generator.run()?;

    Ok(BenchmarkResult {
        run_number,
        duration: summary.wall_time,
        throughput_mbs: summary.wall_throughput_mbps(),
        failed: summary.stats.failed,
    })
}

/// Mean duration, standard deviation, min, max and mean throughput.
fn calculate_statistics(results: &[BenchmarkResult]) -> (f64, f64, f64, f64, f64) {
    let durations: Vec<f64> = results.iter().map(|r| r.duration.as_secs_f64()).collect();
    let throughputs: Vec<f64> = results.iter().map(|r| r.throughput_mbs).collect();

    let mean_duration = durations.iter().sum::<f64>() / durations.len() as f64;
    let mean_throughput = throughputs.iter().sum::<f64>() / throughputs.len() as f64;

    let min_duration = durations.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_duration = durations.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let variance = durations
        .iter()
        .map(|d| (d - mean_duration).powi(2))
        .sum::<f64>()
        / durations.len() as f64;

    (
        mean_duration,
        variance.sqrt(),
        min_duration,
        max_duration,
        mean_throughput,
    )
}

/// Hours to fill one terabyte at `throughput_mbs`, plus a `Xh Ym Zs` rendering.
fn estimate_terabyte_time(throughput_mbs: f64) -> (f64, String) {
    let one_tb_mb = 1024.0 * 1024.0;
    let seconds = one_tb_mb / throughput_mbs;
    let hours = seconds / 3600.0;
    let h = hours as usize;
    let m = ((seconds % 3600.0) / 60.0) as usize;
    let s = (seconds % 60.0) as usize;

    (hours, format!("{}h {}m {}s", h, m, s))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let file_size = parse_size(&args.size)?;
    if file_size <= 0 {
        return Err(format!("file size must be positive, got {}", args.size).into());
    }
    let file_size = file_size as u64;
    let runs = args.runs.max(1);

    let mut worker_counts = if args.workers.is_empty() {
        vec![1, 2, default_worker_count()]
    } else {
        args.workers.clone()
    };
    worker_counts.retain(|w| *w > 0);
    worker_counts.sort_unstable();
    worker_counts.dedup();

    let parent = args.directory.clone().unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&parent)?;

    println!("═══════════════════════════════════════════════════════════════════════════════");
    println!("                      FILEFORGE GENERATION BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════════════════════\n");

    let sys_info = get_system_info();
    println!("📊 SYSTEM SPECIFICATIONS:");
    println!("─────────────────────────────────────────────────────────────────────────────");
    println!("CPU: {}", sys_info.cpu_name);
    println!("  Logical Cores: {}", sys_info.cpu_cores);
    println!(
        "RAM: {:.2} GB total, {:.2} GB available",
        sys_info.total_memory_gb, sys_info.available_memory_gb
    );
    println!("Page size: {}", human_readable_size(sys_info.page_size as u64));
    println!(
        "Buffer size: {} (auto-optimized)\n",
        human_readable_size(optimal_buffer_size() as u64)
    );

    println!("📁 Workload:");
    println!(
        "  {} files x {} = {} per run, {} runs per worker count",
        args.files,
        human_readable_size(file_size),
        human_readable_size(file_size * args.files),
        runs
    );
    println!("  Scratch directory: {}\n", parent.display());

    let mut all_results = Vec::new();

    for workers in worker_counts {
        println!("═══════════════════════════════════════════════════════════════════════════════");
        println!("🔧 Testing: {} workers", workers);
        println!("═══════════════════════════════════════════════════════════════════════════════");

        let mut condition_results = Vec::new();
        for run in 1..=runs {
            let result = run_single_benchmark(run, &parent, workers, args.files, file_size)?;
            println!(
                "Run {:2}/{}: {:.3}s ({:.2} MB/s){}",
                result.run_number,
                runs,
                result.duration.as_secs_f64(),
                result.throughput_mbs,
                if result.failed > 0 {
                    format!(" - {} files failed", result.failed)
                } else {
                    String::new()
                }
            );
            condition_results.push(result);
        }

        let (mean_duration, stddev, min_duration, max_duration, mean_throughput) =
            calculate_statistics(&condition_results);

        println!("\n📈 Statistics for {} workers:", workers);
        println!("─────────────────────────────────────────────────────────────────────────────");
        println!("  Mean time:        {:.3}s (±{:.3}s)", mean_duration, stddev);
        println!("  Fastest:          {:.3}s", min_duration);
        println!("  Slowest:          {:.3}s", max_duration);
        println!("  Mean throughput:  {:.2} MB/s", mean_throughput);
        let (tb_hours, tb_formatted) = estimate_terabyte_time(mean_throughput);
        println!("  Estimated 1TB:    {} ({:.2} hours)\n", tb_formatted, tb_hours);

        all_results.push((workers, condition_results));
    }

    println!("═══════════════════════════════════════════════════════════════════════════════");
    println!("                          PERFORMANCE COMPARISON");
    println!("═══════════════════════════════════════════════════════════════════════════════\n");

    if let Some((baseline_workers, baseline_results)) = all_results.first() {
        let (baseline_mean, _, _, _, baseline_throughput) = calculate_statistics(baseline_results);
        for (i, (workers, results)) in all_results.iter().enumerate() {
            let (mean_duration, _stddev, _min, _max, mean_throughput) =
                calculate_statistics(results);
            println!("{}. {} workers", i + 1, workers);
            println!(
                "   Average: {:.3}s | Throughput: {:.2} MB/s",
                mean_duration, mean_throughput
            );
            if i > 0 {
                let speedup = baseline_mean / mean_duration;
                let throughput_gain =
                    ((mean_throughput - baseline_throughput) / baseline_throughput) * 100.0;
                println!(
                    "   vs {} workers: {:.2}x faster | Throughput gain: {:.1}%",
                    baseline_workers, speedup, throughput_gain
                );
            }
            println!();
        }
    }

    println!("═══════════════════════════════════════════════════════════════════════════════");
    println!("                              BENCHMARK COMPLETE");
    println!("═══════════════════════════════════════════════════════════════════════════════");
    Ok(())
}
