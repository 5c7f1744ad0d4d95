//! Shrinking balls over a whole point cloud.
//!
//! Every point is solved independently against the shared, read-only index,
//! so the work is spread over the rayon thread pool with no synchronization.

use std::time::Instant;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{MedialError, MedialResult};
use crate::params::MedialParams;
use crate::result::{MedialAxis, MedialBall, MedialPass, Orientation, Termination};
use crate::shrinking_ball::shrink_ball;
use crate::spatial::{KdTreeIndex, SpatialIndex};

/// Shrink one ball per point for the given orientation.
///
/// `Orientation::Inner` uses `normals` as given, `Orientation::Outer` negates
/// them. The output holds one ball per point, in input order.
///
/// `points` and `normals` are expected to have the same length; extra
/// entries of the longer slice are ignored. Use [`compute_medial_axis`] for a
/// validated run.
///
/// # Example
///
/// ```
/// use mesh_medial::batch::shrink_balls;
/// use mesh_medial::spatial::KdTreeIndex;
/// use mesh_medial::{MedialParams, Orientation};
/// use nalgebra::{Point3, Vector3};
///
/// let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)];
/// let normals = vec![Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0)];
/// let index = KdTreeIndex::build(&points, true);
/// let params = MedialParams::default().initial_radius(10.0);
///
/// let pass = shrink_balls(&points, &normals, &index, &params, Orientation::Inner);
/// assert_eq!(pass.len(), 2);
/// assert!((pass.balls[0].radius - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn shrink_balls<I>(
    points: &[Point3<f64>],
    normals: &[Vector3<f64>],
    index: &I,
    params: &MedialParams,
    orientation: Orientation,
) -> MedialPass
where
    I: SpatialIndex + ?Sized,
{
    let balls: Vec<MedialBall> = points
        .par_iter()
        .zip(normals.par_iter())
        .map(|(p, n)| {
            let n = match orientation {
                Orientation::Inner => *n,
                Orientation::Outer => -n,
            };
            shrink_ball(p, &n, index, params)
        })
        .collect();

    MedialPass { orientation, balls }
}

/// Compute interior and exterior medial balls for an oriented point cloud.
///
/// Validates the input, builds the spatial index once and runs both passes
/// against it.
///
/// # Errors
///
/// Returns an error if the cloud is empty, the point and normal counts
/// differ, a coordinate is not finite, or the parameters are invalid.
///
/// # Example
///
/// ```
/// use mesh_medial::{compute_medial_axis, MedialParams};
/// use nalgebra::{Point3, Vector3};
///
/// let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)];
/// let normals = vec![Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0)];
/// let params = MedialParams::default().initial_radius(10.0);
///
/// let axis = compute_medial_axis(&points, &normals, &params).unwrap();
/// assert_eq!(axis.inner.len(), 2);
/// assert_eq!(axis.outer.len(), 2);
/// ```
pub fn compute_medial_axis(
    points: &[Point3<f64>],
    normals: &[Vector3<f64>],
    params: &MedialParams,
) -> MedialResult<MedialAxis> {
    validate_input(points, normals)?;
    params.validate()?;

    info!(
        points = points.len(),
        initial_radius = params.initial_radius,
        denoise_preserve = ?params.denoise_preserve.map(f64::to_degrees),
        denoise_planar = ?params.denoise_planar.map(f64::to_degrees),
        nan_for_initial_radius = params.nan_for_initial_radius,
        "Starting medial axis computation"
    );

    let timer = Instant::now();
    let index = KdTreeIndex::build(points, params.reserve_index);
    info!(elapsed_ms = elapsed_ms(timer), "Constructed k-d tree");

    let inner = run_pass(points, normals, &index, params, Orientation::Inner);
    let outer = run_pass(points, normals, &index, params, Orientation::Outer);

    Ok(MedialAxis { inner, outer })
}

fn run_pass<I>(
    points: &[Point3<f64>],
    normals: &[Vector3<f64>],
    index: &I,
    params: &MedialParams,
    orientation: Orientation,
) -> MedialPass
where
    I: SpatialIndex + ?Sized,
{
    let timer = Instant::now();
    let pass = shrink_balls(points, normals, index, params, orientation);

    info!(
        pass = %orientation,
        elapsed_ms = elapsed_ms(timer),
        ceiling = pass.ceiling_count(),
        "Done shrinking balls"
    );
    debug!("{pass}");

    let limited = pass.count(Termination::IterationLimit);
    if limited > 0 {
        warn!(
            pass = %orientation,
            count = limited,
            "Some balls hit the iteration limit before converging"
        );
    }

    pass
}

fn elapsed_ms(timer: Instant) -> String {
    format!("{:.1}", timer.elapsed().as_secs_f64() * 1000.0)
}

fn validate_input(points: &[Point3<f64>], normals: &[Vector3<f64>]) -> MedialResult<()> {
    if points.is_empty() {
        return Err(MedialError::EmptyPointCloud);
    }
    if points.len() != normals.len() {
        return Err(MedialError::MismatchedLengths {
            points: points.len(),
            normals: normals.len(),
        });
    }
    if let Some(index) = points.iter().position(|p| !p.coords.iter().all(|v| v.is_finite())) {
        return Err(MedialError::NonFiniteInput {
            what: "point",
            index,
        });
    }
    if let Some(index) = normals.iter().position(|n| !n.iter().all(|v| v.is_finite())) {
        return Err(MedialError::NonFiniteInput {
            what: "normal",
            index,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Noise-free sampled sphere with outward normals.
    fn sphere_cloud(count: usize, radius: f64) -> (Vec<Point3<f64>>, Vec<Vector3<f64>>) {
        let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        let points: Vec<Point3<f64>> = (0..count)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
                let ring = (1.0 - z * z).sqrt();
                let theta = golden * i as f64;
                Point3::new(ring * theta.cos(), ring * theta.sin(), z) * radius
            })
            .collect();
        let normals = points.iter().map(|p| p.coords.normalize()).collect();
        (points, normals)
    }

    #[test]
    fn test_pass_preserves_input_order() {
        let (points, normals) = sphere_cloud(300, 1.0);
        let index = KdTreeIndex::build(&points, true);
        let params = MedialParams::default().initial_radius(10.0);

        let pass = shrink_balls(&points, &normals, &index, &params, Orientation::Inner);

        assert_eq!(pass.len(), points.len());
        for (i, (p, ball)) in points.iter().zip(&pass.balls).enumerate() {
            let expected = shrink_ball(p, &normals[i], &index, &params);
            assert_eq!(*ball, expected);
        }
    }

    #[test]
    fn test_outer_pass_matches_negated_normals() {
        let (points, normals) = sphere_cloud(150, 1.0);
        let index = KdTreeIndex::build(&points, true);
        let params = MedialParams::default().initial_radius(10.0);
        let negated: Vec<Vector3<f64>> = normals.iter().map(|n| -n).collect();

        let outer = shrink_balls(&points, &normals, &index, &params, Orientation::Outer);
        let inner_of_negated =
            shrink_balls(&points, &negated, &index, &params, Orientation::Inner);

        assert_eq!(outer.balls, inner_of_negated.balls);
    }

    #[test]
    fn test_compute_sphere_axis() {
        let (points, normals) = sphere_cloud(500, 3.0);
        let params = MedialParams::default().initial_radius(30.0);

        let axis = compute_medial_axis(&points, &normals, &params).unwrap();

        assert_eq!(axis.inner.orientation, Orientation::Inner);
        assert_eq!(axis.outer.orientation, Orientation::Outer);
        for ball in &axis.inner.balls {
            assert_relative_eq!(ball.radius, 3.0, epsilon = 1e-6);
            assert!(ball.center.coords.norm() < 1e-6);
        }
        assert_eq!(axis.outer.ceiling_count(), points.len());
        assert_eq!(axis.inner.count(Termination::IterationLimit), 0);
    }

    #[test]
    fn test_compute_axis_aligned_plane() {
        // Exact z = 0 grid: every sample shares one coordinate
        let mut points = Vec::new();
        for i in -20..=20 {
            for j in -20..=20 {
                points.push(Point3::new(f64::from(i), f64::from(j), 0.0));
            }
        }
        let normals = vec![Vector3::z(); points.len()];

        let axis = compute_medial_axis(&points, &normals, &MedialParams::default()).unwrap();

        assert_eq!(axis.inner.len(), 1681);
        for pass in [&axis.inner, &axis.outer] {
            assert_eq!(pass.ceiling_count(), points.len());
            for ball in &pass.balls {
                assert_relative_eq!(ball.radius, 200.0);
            }
        }
        assert_relative_eq!(axis.inner.balls[0].center, Point3::new(-20.0, -20.0, -200.0));
        assert_relative_eq!(axis.outer.balls[0].center, Point3::new(-20.0, -20.0, 200.0));
    }

    #[test]
    fn test_compute_many_duplicate_points() {
        let mut points = vec![Point3::new(0.5, -1.0, 2.0); 40];
        let (sphere, _) = sphere_cloud(60, 1.0);
        points.extend(sphere);
        let normals: Vec<Vector3<f64>> = points.iter().map(|p| p.coords.normalize()).collect();
        let params = MedialParams::default().initial_radius(10.0);

        let axis = compute_medial_axis(&points, &normals, &params).unwrap();

        for pass in [&axis.inner, &axis.outer] {
            assert_eq!(pass.len(), 100);
            for ball in &pass.balls {
                assert!(ball.radius > 0.0 && ball.radius <= 10.0);
                assert!(ball.center.coords.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn test_compute_rejects_empty_cloud() {
        let err = compute_medial_axis(&[], &[], &MedialParams::default()).unwrap_err();
        assert!(matches!(err, MedialError::EmptyPointCloud));
    }

    #[test]
    fn test_compute_rejects_mismatched_lengths() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3::z()];
        let err = compute_medial_axis(&points, &normals, &MedialParams::default()).unwrap_err();
        assert!(matches!(
            err,
            MedialError::MismatchedLengths {
                points: 2,
                normals: 1
            }
        ));
    }

    #[test]
    fn test_compute_rejects_non_finite() {
        let points = vec![Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0)];
        let normals = vec![Vector3::z(), Vector3::z()];
        let err = compute_medial_axis(&points, &normals, &MedialParams::default()).unwrap_err();
        assert!(matches!(
            err,
            MedialError::NonFiniteInput {
                what: "point",
                index: 1
            }
        ));

        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3::z(), Vector3::new(0.0, f64::INFINITY, 0.0)];
        let err = compute_medial_axis(&points, &normals, &MedialParams::default()).unwrap_err();
        assert!(matches!(err, MedialError::NonFiniteInput { what: "normal", .. }));
    }

    #[test]
    fn test_compute_rejects_invalid_params() {
        let points = vec![Point3::origin()];
        let normals = vec![Vector3::z()];
        let params = MedialParams::default().initial_radius(-1.0);
        let err = compute_medial_axis(&points, &normals, &params).unwrap_err();
        assert!(matches!(err, MedialError::InvalidParams(_)));
    }

    #[test]
    fn test_single_point_cloud() {
        let points = vec![Point3::new(1.0, 1.0, 1.0)];
        let normals = vec![Vector3::x()];
        let params = MedialParams::default().initial_radius(4.0);

        let axis = compute_medial_axis(&points, &normals, &params).unwrap();

        assert_eq!(axis.inner.balls[0].termination, Termination::Isolated);
        assert_eq!(axis.outer.balls[0].termination, Termination::Isolated);
        assert_relative_eq!(axis.inner.balls[0].center, Point3::new(-3.0, 1.0, 1.0));
        assert_relative_eq!(axis.outer.balls[0].center, Point3::new(5.0, 1.0, 1.0));
    }
}
