//! nicheprep CLI - predictor preparation for species distribution models

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nicheprep_algorithms::correlation::correlation_matrix;
use nicheprep_algorithms::pca::{center, compute_pca, PcaParams};
use nicheprep_algorithms::statistics::ReduceParams;
use nicheprep_algorithms::thinning::{deduplicate, DedupParams, Representative};
use nicheprep_algorithms::PredictorPipeline;
use nicheprep_core::config::Units;
use nicheprep_core::io::{read_band, read_grid, read_points, write_grid, write_points, GeoTiffOptions};
use nicheprep_core::{Grid, GridGeometry, PipelineConfig, PointSet, Region};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "nicheprep")]
#[command(author, version, about = "Predictor preparation for species distribution models", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML configuration (default: $NICHEPREP_CONFIG, then ./nicheprep.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a single-band GeoTIFF
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Keep one occurrence per grid cell.
    ///
    /// Cells are anchored at (0, 0) unless --align-to names a raster, in which
    /// case they start at its corner as in `run`.
    Dedup {
        /// Occurrence CSV
        points: PathBuf,
        /// Output CSV
        output: PathBuf,
        /// Cell size in metres (default: grain_size from the configuration)
        #[arg(short = 's', long)]
        cell_size: Option<f64>,
        /// Seed for a random representative per cell
        #[arg(long)]
        seed: Option<u64>,
        /// Raster whose corner anchors the cells (as the pipeline does)
        #[arg(long, value_name = "RASTER")]
        align_to: Option<PathBuf>,
    },
    /// Principal components of the configured PCA bands
    Pca {
        /// Input bands as name=path, one per file
        #[arg(short, long = "band", value_parser = parse_band, required = true)]
        bands: Vec<(String, PathBuf)>,
        /// Occurrence CSV; reductions run over the cells it occupies
        /// (default: the configured region)
        #[arg(short, long)]
        points: Option<PathBuf>,
        /// Output directory for pc*.tif and pca.json
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Spearman matrix of bands sampled at occurrences
    Correlate {
        /// Input bands as name=path, one per file
        #[arg(short, long = "band", value_parser = parse_band, required = true)]
        bands: Vec<(String, PathBuf)>,
        /// Occurrence CSV
        #[arg(short, long)]
        points: PathBuf,
        /// Output JSON
        #[arg(short, long)]
        output: PathBuf,
        /// Sampling resolution in metres (default: the rasters' own)
        #[arg(short, long)]
        scale: Option<f64>,
    },
    /// Full pipeline: deduplicate, mask, PCA, predictor stack, correlation
    Run {
        /// Input bands as name=path, one per file
        #[arg(short, long = "band", value_parser = parse_band, required = true)]
        bands: Vec<(String, PathBuf)>,
        /// Occurrence CSV
        #[arg(short, long)]
        points: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_band(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected name=path, got '{}'", s)),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(p) => PipelineConfig::load_from(p),
        None => PipelineConfig::load(),
    };
    config.context("Failed to load configuration")
}

fn read_bands(bands: &[(String, PathBuf)]) -> Result<Grid> {
    let pb = spinner("Reading rasters...");
    let grid = read_grid(bands).context("Failed to read rasters")?;
    pb.finish_and_clear();
    info!(
        "Input: {} bands, {} x {}",
        grid.n_bands(),
        grid.cols(),
        grid.rows()
    );
    Ok(grid)
}

fn read_occurrences(path: &Path) -> Result<PointSet> {
    let points = read_points(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Occurrences: {}", points.len());
    Ok(points)
}

fn tiff_options(config: &PipelineConfig) -> GeoTiffOptions {
    GeoTiffOptions {
        geographic: config.units == Units::Degrees,
    }
}

fn write_stack(grid: &Grid, dir: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let pb = spinner("Writing rasters...");
    let paths = write_grid(grid, dir, &tiff_options(config)).context("Failed to write rasters")?;
    pb.finish_and_clear();
    Ok(paths)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let (band, transform) = read_band(&input).context("Failed to read raster")?;
            pb.finish_and_clear();
            let grid = Grid::from_bands(transform, vec![("band".into(), band)])?;
            let (rows, cols) = grid.shape();
            let bounds = grid.bounds();
            let stats = grid.band_statistics("band")?;

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
            println!("Cell size: {}", grid.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
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
                100.0 * stats.valid_count as f64 / (rows * cols) as f64
            );
        }

        // ── Deduplicate ──────────────────────────────────────────────
        Commands::Dedup {
            points,
            output,
            cell_size,
            seed,
            align_to,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let occurrences = read_occurrences(&points)?;
            let cell_size = config.units.metres_to_crs(cell_size.unwrap_or(config.grain_size));
            let representative = match seed.or(config.seed) {
                Some(seed) => Representative::Seeded(seed),
                None => Representative::First,
            };

            let start = Instant::now();
            let params = match &align_to {
                Some(path) => {
                    let (band, transform) = read_band(path)
                        .with_context(|| format!("Failed to read reference raster {}", path.display()))?;
                    let geometry = GridGeometry::new(band.nrows(), band.ncols(), transform);
                    DedupParams::aligned_with(&geometry, cell_size)
                }
                None => DedupParams::new(cell_size),
            }
            .with_representative(representative);
            let kept = deduplicate(&occurrences, &params).context("Failed to deduplicate")?;
            let elapsed = start.elapsed();

            write_points(&kept, &output).context("Failed to write occurrences")?;
            println!("Kept {} of {} occurrences", kept.len(), occurrences.len());
            done("Deduplicated occurrences", &output, elapsed);
        }

        // ── PCA ──────────────────────────────────────────────────────
        Commands::Pca {
            bands,
            points,
            output_dir,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let grid = read_bands(&bands)?;
            let region = match &points {
                Some(path) => Region::footprint(&read_occurrences(path)?),
                None => config.region()?,
            };

            let start = Instant::now();
            let (centered, _) = center(
                &grid,
                &region,
                &ReduceParams::at_scale(config.mean_resolution(), config.max_pixels),
            )
            .context("Failed to center bands")?;
            let params = PcaParams {
                reduce: ReduceParams::at_scale(config.grain(), config.max_pixels),
                ..PcaParams::default()
            };
            let result = compute_pca(&centered, &region, &params).context("Failed to compute PCA")?;
            let elapsed = start.elapsed();

            write_stack(&result.components, &output_dir, &config)?;
            write_json(&result.summary(), &output_dir.join("pca.json"))?;
            for (name, explained) in result.component_names().iter().zip(result.variance_explained()) {
                println!("  {}: {:.2}% of variance", name, 100.0 * explained);
            }
            done("Principal components", &output_dir, elapsed);
        }

        // ── Correlation ──────────────────────────────────────────────
        Commands::Correlate {
            bands,
            points,
            output,
            scale,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let grid = read_bands(&bands)?;
            let occurrences = read_occurrences(&points)?;

            let start = Instant::now();
            let scale = scale.map(|m| config.units.metres_to_crs(m));
            let matrix = correlation_matrix(&grid, &occurrences, scale).context("Failed to correlate bands")?;
            let elapsed = start.elapsed();

            write_json(&matrix, &output)?;
            done("Correlation matrix", &output, elapsed);
        }

        // ── Full pipeline ────────────────────────────────────────────
        Commands::Run {
            bands,
            points,
            output_dir,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = PredictorPipeline::new(config.clone()).context("Invalid configuration")?;
            let environment = read_bands(&bands)?;
            let occurrences = read_occurrences(&points)?;

            let start = Instant::now();
            let output = pipeline
                .run(&occurrences, &environment)
                .context("Pipeline failed")?;
            let elapsed = start.elapsed();

            fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            write_stack(&output.predictors, &output_dir, &config)?;
            write_points(&output.occurrences, output_dir.join("occurrences.csv"))
                .context("Failed to write occurrences")?;
            write_json(&output.correlation, &output_dir.join("correlation.json"))?;
            write_json(&output.pca.summary(), &output_dir.join("pca.json"))?;

            println!(
                "Predictors: {} | occurrences kept: {}",
                output.predictors.band_names().join(", "),
                output.occurrences.len()
            );
            done("Pipeline outputs", &output_dir, elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band() {
        assert_eq!(
            parse_band("bio01=/data/bio01.tif").unwrap(),
            ("bio01".to_string(), PathBuf::from("/data/bio01.tif"))
        );
        assert!(parse_band("bio01").is_err());
        assert!(parse_band("=x.tif").is_err());
    }

    #[test]
    fn test_cli_parses_dedup_alignment() {
        let cli = Cli::try_parse_from([
            "nicheprep",
            "dedup",
            "occ.csv",
            "thinned.csv",
            "--align-to",
            "bio01.tif",
        ])
        .unwrap();
        match cli.command {
            Commands::Dedup { align_to, seed, .. } => {
                assert_eq!(align_to, Some(PathBuf::from("bio01.tif")));
                assert_eq!(seed, None);
            }
            _ => panic!("expected dedup"),
        }
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "nicheprep",
            "run",
            "-b",
            "bio01=a.tif",
            "-b",
            "elevation=b.tif",
            "-p",
            "occ.csv",
            "-o",
            "out",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { bands, .. } => assert_eq!(bands.len(), 2),
            _ => panic!("expected run"),
        }
    }
}
