//! Shrinking-ball medial axis for `.npy` point clouds.
//!
//! Reads `<input>/coords.npy` and `<input>/normals.npy` and writes
//! `ma_coords_{in,out}.npy` and `ma_qidx_{in,out}.npy` to the output
//! directory.
//!
//! # Usage
//!
//! - `compute_ma data/` - interior and exterior axis with default parameters
//! - `compute_ma data/ out/ -r 50 -p 0` - smaller ceiling, no planar rule
//! - `RUST_LOG=mesh_medial=trace compute_ma data/` - per-iteration tracing

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mesh_medial::{MedialParams, MedialPaths, run};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Compute the medial axis of an oriented point cloud
#[derive(Parser)]
#[command(name = "compute_ma")]
#[command(about = "Shrinking-ball medial axis for .npy point clouds", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding coords.npy and normals.npy
    input: PathBuf,

    /// Output directory (defaults to the input directory)
    output: Option<PathBuf>,

    /// Initial (and maximum) ball radius
    #[arg(short = 'r', long = "radius", default_value_t = 200.0)]
    radius: f64,

    /// Edge preservation angle in degrees, 0 disables
    #[arg(short = 'd', long = "preserve", default_value_t = 20.0)]
    preserve: f64,

    /// Planar rejection angle in degrees, 0 disables
    #[arg(short = 'p', long = "planar", default_value_t = 32.0)]
    planar: f64,

    /// Write NaN centers for balls left at the initial radius
    #[arg(short = 'a', long = "nan")]
    nan: bool,

    /// Grow the k-d tree while inserting instead of pre-sizing it
    #[arg(short = 'N', long = "no-kdtree-reorder")]
    no_reserve: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn params(&self) -> MedialParams {
        MedialParams::default()
            .initial_radius(self.radius)
            .denoise_preserve_degrees(self.preserve)
            .denoise_planar_degrees(self.planar)
            .nan_for_initial_radius(self.nan)
            .reserve_index(!self.no_reserve)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = MedialPaths::new(&cli.input, cli.output.as_deref());
    let params = cli.params();
    info!(
        input = %cli.input.display(),
        output = %paths.output.display(),
        "compute_ma"
    );

    let axis = run(&paths, &params)
        .with_context(|| format!("Failed to compute medial axis for {}", cli.input.display()))?;

    print!("{axis}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["compute_ma", "data"]);
        let params = cli.params();

        assert_eq!(cli.input, PathBuf::from("data"));
        assert!(cli.output.is_none());
        assert!((params.initial_radius - 200.0).abs() < f64::EPSILON);
        assert!((params.denoise_preserve.unwrap_or_default() - 20f64.to_radians()).abs() < 1e-12);
        assert!((params.denoise_planar.unwrap_or_default() - 32f64.to_radians()).abs() < 1e-12);
        assert!(!params.nan_for_initial_radius);
        assert!(params.reserve_index);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "compute_ma", "in", "out", "-r", "50", "-d", "0", "-p", "10", "-a", "-N", "-vv",
        ]);
        let params = cli.params();

        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!((params.initial_radius - 50.0).abs() < f64::EPSILON);
        assert!(params.denoise_preserve.is_none());
        assert!(params.denoise_planar.is_some());
        assert!(params.nan_for_initial_radius);
        assert!(!params.reserve_index);
        assert_eq!(cli.verbose, 2);
    }
}
