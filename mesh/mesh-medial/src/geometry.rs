//! Geometry primitives for tangent balls.

use nalgebra::{Point3, Vector3};

/// Signed radius of the ball tangent at `p` (normal `n`) that passes through `q`.
///
/// The ball is centered at `p - n * r`. A negative radius means `q` lies on
/// the other side of the tangent plane. When `n` is nearly perpendicular to
/// `p - q` the result blows up towards infinity; callers bound it instead of
/// special-casing the singularity.
///
/// # Example
///
/// ```
/// use mesh_medial::geometry::tangent_ball_radius;
/// use nalgebra::{Point3, Vector3};
///
/// let p = Point3::origin();
/// let n = Vector3::new(0.0, 0.0, -1.0);
/// let q = Point3::new(0.0, 0.0, 1.0);
/// assert!((tangent_ball_radius(&p, &n, &q) - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn tangent_ball_radius(p: &Point3<f64>, n: &Vector3<f64>, q: &Point3<f64>) -> f64 {
    let pq = p - q;
    let d = pq.norm();
    let cos_theta = n.dot(&pq) / d;
    d / (2.0 * cos_theta)
}

/// Cosine of the angle between `u` and `v`, clamped to `[-1, 1]`.
#[must_use]
pub fn cos_angle(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let cos = u.dot(v) / (u.norm() * v.norm());
    cos.clamp(-1.0, 1.0)
}

/// Angle in radians between `u` and `v`.
#[must_use]
pub fn separation_angle(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    cos_angle(u, v).acos()
}

/// Center of the ball of radius `r` tangent at `p` with normal `n`.
#[inline]
#[must_use]
pub fn ball_center(p: &Point3<f64>, n: &Vector3<f64>, r: f64) -> Point3<f64> {
    p - n * r
}

/// Sentinel center emitted for balls that never shrank below the ceiling.
#[inline]
#[must_use]
pub fn nan_point() -> Point3<f64> {
    Point3::new(f64::NAN, f64::NAN, f64::NAN)
}
