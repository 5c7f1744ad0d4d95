//! End-to-end run over an input and output directory.
//!
//! Reads `coords.npy` and `normals.npy`, computes both medial axis passes and
//! writes one coordinate file and one feature index file per pass.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::batch::compute_medial_axis;
use crate::error::{MedialError, MedialResult};
use crate::io::{load_points, load_vectors, save_indices, save_points};
use crate::params::MedialParams;
use crate::result::{MedialAxis, Orientation};

/// Input point coordinates file name.
pub const COORDS_FILE: &str = "coords.npy";

/// Input normals file name.
pub const NORMALS_FILE: &str = "normals.npy";

/// Resolved file locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedialPaths {
    /// Input point coordinates.
    pub coords: PathBuf,
    /// Input normals.
    pub normals: PathBuf,
    /// Output directory.
    pub output: PathBuf,
}

impl MedialPaths {
    /// Resolve paths for an input directory and optional output directory.
    ///
    /// The output directory defaults to the input directory.
    #[must_use]
    pub fn new(input: impl AsRef<Path>, output: Option<&Path>) -> Self {
        let input = input.as_ref();
        Self {
            coords: input.join(COORDS_FILE),
            normals: input.join(NORMALS_FILE),
            output: output.unwrap_or(input).to_path_buf(),
        }
    }

    /// Output coordinates file for a pass, e.g. `ma_coords_in.npy`.
    #[must_use]
    pub fn coords_out(&self, orientation: Orientation) -> PathBuf {
        self.output.join(format!("ma_coords_{}.npy", orientation.as_str()))
    }

    /// Output feature index file for a pass, e.g. `ma_qidx_out.npy`.
    #[must_use]
    pub fn qidx_out(&self, orientation: Orientation) -> PathBuf {
        self.output.join(format!("ma_qidx_{}.npy", orientation.as_str()))
    }

    /// Check that both inputs exist and the output location is writable.
    ///
    /// Nothing is loaded; the first output file is opened without
    /// truncation to check write access.
    ///
    /// # Errors
    ///
    /// Returns [`MedialError::InputNotFound`] for a missing input file and
    /// [`MedialError::OutputNotWritable`] if the output cannot be created.
    pub fn validate(&self) -> MedialResult<()> {
        for path in [&self.coords, &self.normals] {
            if !path.is_file() {
                return Err(MedialError::InputNotFound { path: path.clone() });
            }
        }

        let target = self.coords_out(Orientation::Inner);
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&target)
            .map_err(|source| MedialError::OutputNotWritable {
                path: target,
                source,
            })?;

        Ok(())
    }
}

/// Load a point cloud, compute its medial axis and write the results.
///
/// # Errors
///
/// Returns an error if the parameters or paths are invalid, an input array
/// is malformed, the arrays have different row counts, or an output cannot
/// be written. Parameters and paths are checked before any data is loaded.
pub fn run(paths: &MedialPaths, params: &MedialParams) -> MedialResult<MedialAxis> {
    params.validate()?;
    paths.validate()?;

    let timer = Instant::now();
    let points = load_points(&paths.coords)?;
    let normals = load_vectors(&paths.normals)?;
    if points.len() != normals.len() {
        return Err(MedialError::MismatchedLengths {
            points: points.len(),
            normals: normals.len(),
        });
    }
    info!(
        points = points.len(),
        input = %paths.coords.display(),
        elapsed_ms = format!("{:.1}", timer.elapsed().as_secs_f64() * 1000.0),
        "Loaded point cloud"
    );

    let axis = compute_medial_axis(&points, &normals, params)?;

    for orientation in [Orientation::Inner, Orientation::Outer] {
        let pass = axis.pass(orientation);
        let coords = paths.coords_out(orientation);
        let qidx = paths.qidx_out(orientation);
        save_points(&coords, &pass.centers())?;
        save_indices(&qidx, &pass.features())?;
        info!(
            pass = %orientation,
            coords = %coords.display(),
            qidx = %qidx.display(),
            "Wrote medial axis"
        );
    }

    Ok(axis)
}
