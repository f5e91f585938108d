//! topowind CLI - wind exposure preprocessing for DEMs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use topowind_algorithms::package::{GridMetadata, Packager};
use topowind_algorithms::wind::{
    maxus, tbreak_from_dem, window, AzimuthSet, ElevationGrid, MaxusParams, MaxusStack,
    TbreakParams, WindowParams,
};
use topowind_core::io::{read_dem, stack_writer_for, RasterFormat};
use topowind_core::Raster;
use topowind_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "topowind")]
#[command(author, version, about = "Wind exposure preprocessing for DEMs", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a DEM
    Info {
        /// Input DEM (.tif or .asc)
        input: PathBuf,
    },
    /// Compute maximum upwind slope, and optionally topographic break
    Maxus(MaxusArgs),
}

#[derive(clap::Args)]
struct MaxusArgs {
    /// Input DEM (.tif or .asc)
    dem: PathBuf,
    /// Output file for maxus (.nc or .tif)
    #[arg(short = 'O', long, default_value = "./maxus.nc")]
    out_maxus: PathBuf,
    /// Azimuth increment in degrees; must divide 360
    #[arg(short, long, default_value = "5")]
    increment: u32,
    /// Global search radius in metres
    #[arg(long, default_value = "500")]
    sv_global: f64,
    /// Local search radius in metres (tbreak only)
    #[arg(long, default_value = "100")]
    sv_local: f64,
    /// Height above the subject cell in metres
    #[arg(short = 'H', long, default_value = "3")]
    height: f64,
    /// Directional window width in degrees for the windowed outputs (0 disables)
    #[arg(short = 'W', long, default_value = "100")]
    window: f64,
    /// Also compute tbreak
    #[arg(long)]
    make_tbreak: bool,
    /// Output file for tbreak (.nc or .tif)
    #[arg(long, default_value = "./tbreak.nc")]
    out_tbreak: PathBuf,
    /// Lattice spacing after rotation in metres (default: smaller cell side)
    #[arg(long)]
    step: Option<f64>,
    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(short, long, default_value = "0")]
    threads: usize,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_dem(path: &Path) -> Result<Raster> {
    let pb = spinner("Reading DEM...");
    let raster = read_dem(path).with_context(|| format!("Failed to read DEM {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

/// netCDF output needs the `netcdf` feature; fall back to GeoTIFF without it.
fn resolve_output(path: &Path) -> PathBuf {
    let netcdf = RasterFormat::from_path(path) == Some(RasterFormat::NetCdf);
    if netcdf && !cfg!(feature = "netcdf") {
        let fallback = path.with_extension("tif");
        warn!(
            "built without netCDF support, writing {} instead of {}",
            fallback.display(),
            path.display()
        );
        return fallback;
    }
    path.to_path_buf()
}

/// `<stem>_<width>window.<ext>` next to `path`
fn windowed_path(path: &Path, width: f64) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}window.{}", stem, width, ext),
        None => format!("{}_{}window", stem, width),
    };
    path.with_file_name(name)
}

fn write_stack(stack: &MaxusStack, meta: &GridMetadata, name: &str, path: &Path) -> Result<()> {
    let pb = spinner(&format!("Writing {}...", name));
    let packager = Packager::new(stack_writer_for(path)?);
    let packaged = packager
        .package(stack, meta, name)
        .with_context(|| format!("Failed to package {}", name))?;
    packager
        .publish(&packaged, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    println!("{} saved to: {}", name, path.display());
    Ok(())
}

/// Write a stack and, when requested, its windowed version
fn write_with_window(
    stack: &MaxusStack,
    meta: &GridMetadata,
    name: &str,
    path: &Path,
    width: f64,
) -> Result<()> {
    write_stack(stack, meta, name, path)?;
    if width > 0.0 {
        let windowed = window(stack, &WindowParams { width })
            .with_context(|| format!("Failed to window {}", name))?;
        write_stack(&windowed, meta, name, &windowed_path(path, width))?;
    }
    Ok(())
}

/// Check the window against the azimuth set before any work is done
fn check_window(azimuths: &AzimuthSet, width: f64) -> Result<()> {
    if width.is_nan() || width < 0.0 {
        bail!("--window must be a non-negative number, got {}", width);
    }
    if width > 0.0 {
        WindowParams { width }
            .half_steps(azimuths)
            .context("Invalid --window")?;
    }
    Ok(())
}

fn run_maxus(args: MaxusArgs) -> Result<()> {
    let azimuths = AzimuthSet::from_increment(args.increment).context("Invalid azimuth increment")?;
    check_window(&azimuths, args.window)?;
    let out_maxus = resolve_output(&args.out_maxus);
    let out_tbreak = resolve_output(&args.out_tbreak);
    // fail on an unwritable format before the long computation
    stack_writer_for(&out_maxus).context("Unsupported maxus output")?;
    if args.make_tbreak {
        stack_writer_for(&out_tbreak).context("Unsupported tbreak output")?;
    }

    let raster = load_dem(&args.dem)?;
    let dem = ElevationGrid::from_raster(&raster).context("DEM is not usable for wind exposure")?;
    let meta = GridMetadata::from_raster(&raster);
    let mode = ProcessingMode::from_threads(args.threads);
    info!(
        "{} directions every {} degrees on {} thread(s)",
        azimuths.len(),
        args.increment,
        mode.threads()
    );

    let start = Instant::now();
    let pb = spinner("Computing maxus...");
    let (global, tbreak) = if args.make_tbreak {
        let params = TbreakParams {
            azimuths,
            global_radius: args.sv_global,
            local_radius: args.sv_local,
            height: args.height,
            step: args.step,
            mode,
        };
        let out = tbreak_from_dem(&dem, &params, None).context("Failed to compute tbreak")?;
        (out.global, Some(out.tbreak))
    } else {
        let params = MaxusParams {
            azimuths,
            search_radius: Some(args.sv_global),
            height: args.height,
            step: args.step,
            mode,
        };
        (maxus(&dem, &params, None).context("Failed to compute maxus")?, None)
    };
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    write_with_window(&global, &meta, "maxus", &out_maxus, args.window)?;
    if let Some(tbreak) = tbreak {
        write_with_window(&tbreak, &meta, "tbreak", &out_tbreak, args.window)?;
    }
    println!("  Processing time: {:.2?}", elapsed);
    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let raster = load_dem(input)?;
    let (rows, cols) = raster.shape();
    let (dx, dy) = raster.spacing();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {} x {}", dx, dy);
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(projection) = raster.projection() {
        println!("Projection: {}", projection);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len() as f64
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => run_info(&input),
        Commands::Maxus(args) => run_maxus(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["topowind", "maxus", "dem.tif"]);
        let Commands::Maxus(args) = cli.command else {
            panic!("expected maxus command");
        };
        assert_eq!(args.out_maxus, PathBuf::from("./maxus.nc"));
        assert_eq!(args.increment, 5);
        assert_eq!(args.sv_global, 500.0);
        assert_eq!(args.sv_local, 100.0);
        assert_eq!(args.height, 3.0);
        assert_eq!(args.window, 100.0);
        assert!(!args.make_tbreak);
        assert_eq!(args.out_tbreak, PathBuf::from("./tbreak.nc"));
        assert_eq!(args.threads, 0);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "topowind", "-v", "maxus", "dem.asc", "-O", "out.tif", "-i", "10", "--make-tbreak",
            "--sv-local", "50", "-W", "0", "--step", "15",
        ]);
        assert!(cli.verbose);
        let Commands::Maxus(args) = cli.command else {
            panic!("expected maxus command");
        };
        assert_eq!(args.increment, 10);
        assert!(args.make_tbreak);
        assert_eq!(args.sv_local, 50.0);
        assert_eq!(args.window, 0.0);
        assert_eq!(args.step, Some(15.0));
    }

    #[test]
    fn test_windowed_path() {
        assert_eq!(
            windowed_path(Path::new("./maxus.nc"), 100.0),
            PathBuf::from("./maxus_100window.nc")
        );
        assert_eq!(
            windowed_path(Path::new("/tmp/tb.tif"), 30.0),
            PathBuf::from("/tmp/tb_30window.tif")
        );
    }

    #[test]
    fn test_check_window() {
        for increment in [5, 15, 20, 40, 45, 60, 90] {
            let azimuths = AzimuthSet::from_increment(increment).unwrap();
            assert!(check_window(&azimuths, 100.0).is_ok(), "increment {}", increment);
        }
        let azimuths = AzimuthSet::from_increment(20).unwrap();
        assert!(check_window(&azimuths, 0.0).is_ok());
        assert!(check_window(&azimuths, -5.0).is_err());
        assert!(check_window(&azimuths, f64::NAN).is_err());
        assert!(check_window(&azimuths, 360.0).is_err());
    }

    #[test]
    fn test_resolve_output() {
        assert_eq!(resolve_output(Path::new("a.tif")), PathBuf::from("a.tif"));
        let nc = resolve_output(Path::new("a.nc"));
        if cfg!(feature = "netcdf") {
            assert_eq!(nc, PathBuf::from("a.nc"));
        } else {
            assert_eq!(nc, PathBuf::from("a.tif"));
        }
    }
}
