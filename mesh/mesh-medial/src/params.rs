//! Parameters for shrinking-ball medial axis computation.

use crate::error::{MedialError, MedialResult};

/// Parameters for the shrinking-ball solver.
///
/// Angles are stored in radians. A `None` angle disables the corresponding
/// denoising rule.
///
/// # Example
///
/// ```
/// use mesh_medial::MedialParams;
///
/// let params = MedialParams::default();
/// assert!((params.initial_radius - 200.0).abs() < 1e-10);
/// assert!(params.denoise_preserve.is_some());
///
/// let raw = MedialParams::without_denoising().initial_radius(50.0);
/// assert!(raw.denoise_planar.is_none());
/// assert!(raw.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MedialParams {
    /// Starting ball radius, also the ceiling no ball may exceed.
    pub initial_radius: f64,

    /// Emit a NaN center for balls that end at `initial_radius`.
    pub nan_for_initial_radius: bool,

    /// Edge-preserving threshold on the separation angle (radians).
    ///
    /// When a later iteration sees a small separation angle while the ball is
    /// still larger than the distance to the constraining point, the previous
    /// radius is kept.
    pub denoise_preserve: Option<f64>,

    /// Planar threshold on the first-iteration separation angle (radians).
    ///
    /// Points whose first constraint is nearly tangent are treated as lying
    /// on a flat patch and end at `initial_radius`.
    pub denoise_planar: Option<f64>,

    /// Pre-size the k-d tree for the whole point set.
    ///
    /// Faster build at the cost of peak memory. Results are identical.
    pub reserve_index: bool,
}

impl Default for MedialParams {
    fn default() -> Self {
        Self {
            initial_radius: 200.0,
            nan_for_initial_radius: false,
            denoise_preserve: Some(20.0_f64.to_radians()),
            denoise_planar: Some(32.0_f64.to_radians()),
            reserve_index: true,
        }
    }
}

impl MedialParams {
    /// Params with both denoising rules disabled.
    #[must_use]
    pub fn without_denoising() -> Self {
        Self {
            denoise_preserve: None,
            denoise_planar: None,
            ..Self::default()
        }
    }

    /// Set the initial (ceiling) radius.
    #[must_use]
    pub const fn initial_radius(mut self, radius: f64) -> Self {
        self.initial_radius = radius;
        self
    }

    /// Emit NaN centers for balls that end at the ceiling radius.
    #[must_use]
    pub const fn nan_for_initial_radius(mut self, enabled: bool) -> Self {
        self.nan_for_initial_radius = enabled;
        self
    }

    /// Set the edge-preserving threshold in degrees; `0` disables it.
    #[must_use]
    pub fn denoise_preserve_degrees(mut self, degrees: f64) -> Self {
        self.denoise_preserve = angle_from_degrees(degrees);
        self
    }

    /// Set the planar threshold in degrees; `0` disables it.
    #[must_use]
    pub fn denoise_planar_degrees(mut self, degrees: f64) -> Self {
        self.denoise_planar = angle_from_degrees(degrees);
        self
    }

    /// Choose whether the k-d tree is pre-sized for all points.
    #[must_use]
    pub const fn reserve_index(mut self, enabled: bool) -> Self {
        self.reserve_index = enabled;
        self
    }

    /// Check that the parameters describe a usable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MedialError::InvalidParams`] if the radius is not a positive
    /// finite number or an angle is negative or non-finite.
    pub fn validate(&self) -> MedialResult<()> {
        if !self.initial_radius.is_finite() || self.initial_radius <= 0.0 {
            return Err(MedialError::invalid_params(format!(
                "initial radius must be positive and finite, got {}",
                self.initial_radius
            )));
        }
        for (name, angle) in [
            ("denoise preserve", self.denoise_preserve),
            ("denoise planar", self.denoise_planar),
        ] {
            if let Some(a) = angle {
                if !a.is_finite() || a < 0.0 {
                    return Err(MedialError::invalid_params(format!(
                        "{name} angle must be non-negative and finite, got {a}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn angle_from_degrees(degrees: f64) -> Option<f64> {
    if degrees == 0.0 {
        None
    } else {
        Some(degrees.to_radians())
    }
}
