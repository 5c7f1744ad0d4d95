//! Shrinking-ball solver for a single oriented sample.
//!
//! # Algorithm
//!
//! Start with a ball of radius `initial_radius` tangent to the surface at `p`,
//! centered at `p - n * initial_radius`. Find the sample `q` closest to the
//! current center and replace the ball with the one tangent at `p` that passes
//! through `q`. Repeat until the radius stops changing.
//!
//! The raw iteration is regularized by a handful of stop rules:
//!
//! - **Isolated**: the only sample near the center is `p` itself even after a
//!   full-size ball, so nothing on this side constrains it.
//! - **Wrong side**: `q` lies behind the tangent plane; restart from the
//!   full-size ball.
//! - **Ceiling**: the ball would grow past `initial_radius` (flat or empty
//!   neighborhoods); stop at the ceiling.
//! - **Preserve edges** (optional): late, sharp shrinks against a nearby
//!   sample are noise; keep the previous radius.
//! - **Planar** (optional): a nearly tangent first constraint means a flat
//!   patch; stop at the ceiling.
//! - **Convergence** and an **iteration cap**.

use nalgebra::{Point3, Vector3};
use tracing::trace;

use crate::geometry::{ball_center, nan_point, separation_angle, tangent_ball_radius};
use crate::params::MedialParams;
use crate::result::{MedialBall, Termination};
use crate::spatial::{Neighbor, SpatialIndex};

/// Radius change below which the iteration is considered converged.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-5;

/// Committed iterations after which the current estimate is accepted.
pub const ITERATION_LIMIT: usize = 30;

/// Shrink the ball tangent at `p` with normal `n` until it is empty.
///
/// The ball grows on the side opposite to `n`. `n` must be a unit vector and
/// `index` must contain `p`. This function never fails: every degenerate
/// configuration ends in one of the [`Termination`] fallbacks.
///
/// The returned feature index is the neighbor accepted at the last committed
/// iteration. Early stops (ceiling, planar, preserved edge, isolated) keep the
/// previous value, so it can be stale relative to the returned center.
///
/// # Example
///
/// ```
/// use mesh_medial::shrinking_ball::shrink_ball;
/// use mesh_medial::spatial::KdTreeIndex;
/// use mesh_medial::{MedialParams, Termination};
/// use nalgebra::{Point3, Vector3};
///
/// let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)];
/// let index = KdTreeIndex::build(&points, true);
/// let params = MedialParams::default().initial_radius(10.0);
///
/// let ball = shrink_ball(&points[0], &Vector3::new(0.0, 0.0, -1.0), &index, &params);
/// assert_eq!(ball.termination, Termination::Converged);
/// assert!((ball.radius - 0.5).abs() < 1e-12);
/// assert_eq!(ball.feature, Some(1));
/// ```
#[must_use]
#[allow(clippy::float_cmp)]
pub fn shrink_ball<I>(
    p: &Point3<f64>,
    n: &Vector3<f64>,
    index: &I,
    params: &MedialParams,
) -> MedialBall
where
    I: SpatialIndex + ?Sized,
{
    let initial_radius = params.initial_radius;

    let mut j = 0;
    let mut r_previous = 0.0;
    let mut qidx = None;
    let mut c = ball_center(p, n, initial_radius);
    let mut c_radius = initial_radius;

    loop {
        let neighbors = index.nearest(&c, 2);

        let Some((mut qidx_next, mut q)) = neighbor_point(index, &neighbors, 0) else {
            return ceiling_ball(p, n, params, qidx, Termination::Isolated, j);
        };

        if q == *p {
            // r_previous holds the ceiling verbatim only after a wrong-side restart
            if r_previous == initial_radius {
                return ceiling_ball(p, n, params, qidx, Termination::Isolated, j);
            }
            match neighbor_point(index, &neighbors, 1) {
                Some((i, second)) => {
                    qidx_next = i;
                    q = second;
                }
                None => return ceiling_ball(p, n, params, qidx, Termination::Isolated, j),
            }
        }

        let mut r = tangent_ball_radius(p, n, &q);

        trace!(
            iteration = j,
            candidate = qidx_next,
            radius = r,
            previous = r_previous,
            "Shrinking ball step"
        );

        if r < 0.0 {
            r = initial_radius;
        } else if r > initial_radius || r.is_nan() {
            return ceiling_ball(p, n, params, qidx, Termination::Ceiling, j);
        }

        let c_next = ball_center(p, n, r);

        if params.denoise_preserve.is_some() || params.denoise_planar.is_some() {
            let angle = separation_angle(&(p - c_next), &(q - c_next));

            if let Some(preserve) = params.denoise_preserve {
                if angle < preserve && j > 0 && r > (q - p).norm() {
                    return committed_ball(c, c_radius, params, qidx, Termination::PreservedEdge, j);
                }
            }
            if let Some(planar) = params.denoise_planar {
                if angle < planar && j == 0 {
                    return ceiling_ball(p, n, params, qidx, Termination::Planar, j);
                }
            }
        }

        if (r_previous - r).abs() < CONVERGENCE_TOLERANCE {
            return committed_ball(c, c_radius, params, qidx, Termination::Converged, j);
        }

        if j > ITERATION_LIMIT {
            return committed_ball(c, c_radius, params, qidx, Termination::IterationLimit, j);
        }

        r_previous = r;
        c = c_next;
        c_radius = r;
        qidx = Some(qidx_next);
        j += 1;
    }
}

fn neighbor_point<I>(index: &I, neighbors: &[Neighbor], rank: usize) -> Option<(usize, Point3<f64>)>
where
    I: SpatialIndex + ?Sized,
{
    let neighbor = neighbors.get(rank)?;
    index.point(neighbor.index).map(|q| (neighbor.index, q))
}

/// Ball at the last committed center.
///
/// A committed radius equal to the initial radius means the ball never
/// shrank (for example after repeated wrong-side restarts), so it is
/// reported as [`Termination::Ceiling`]. The center is kept as is and is
/// never replaced by the NaN sentinel.
#[allow(clippy::float_cmp)]
fn committed_ball(
    center: Point3<f64>,
    radius: f64,
    params: &MedialParams,
    feature: Option<usize>,
    termination: Termination,
    iterations: usize,
) -> MedialBall {
    let termination = if radius == params.initial_radius {
        Termination::Ceiling
    } else {
        termination
    };

    MedialBall {
        center,
        radius,
        feature,
        termination,
        iterations,
    }
}

fn ceiling_ball(
    p: &Point3<f64>,
    n: &Vector3<f64>,
    params: &MedialParams,
    feature: Option<usize>,
    termination: Termination,
    iterations: usize,
) -> MedialBall {
    let center = if params.nan_for_initial_radius {
        nan_point()
    } else {
        ball_center(p, n, params.initial_radius)
    };

    MedialBall {
        center,
        radius: params.initial_radius,
        feature,
        termination,
        iterations,
    }
}
