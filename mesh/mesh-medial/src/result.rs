//! Result types for medial axis computation.

use nalgebra::Point3;

/// Which side of the surface a pass shrinks balls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Normals as given: balls grow opposite to the normal.
    Inner,
    /// Negated normals: balls grow along the normal.
    Outer,
}

impl Orientation {
    /// Short name used in file names and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "in",
            Self::Outer => "out",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inner => write!(f, "interior"),
            Self::Outer => write!(f, "exterior"),
        }
    }
}

/// Why the shrinking-ball iteration stopped for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Radius changed by less than the convergence tolerance.
    Converged,
    /// Iteration cap reached; the last estimate is kept.
    IterationLimit,
    /// Candidate radius exceeded the initial radius, or the ball stopped
    /// without ever shrinking below it.
    ///
    /// Only the first case emits the NaN sentinel center.
    Ceiling,
    /// No other sample on the ball side of the point.
    Isolated,
    /// First constraint was nearly tangent (planar denoising).
    Planar,
    /// A noisy shrink near a sharp feature was rejected (edge denoising).
    PreservedEdge,
}

impl Termination {
    /// All variants, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Converged,
        Self::IterationLimit,
        Self::Ceiling,
        Self::Isolated,
        Self::Planar,
        Self::PreservedEdge,
    ];

    /// Returns true if the ball ended at the initial radius.
    #[must_use]
    pub const fn is_at_ceiling(self) -> bool {
        matches!(self, Self::Ceiling | Self::Isolated | Self::Planar)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Converged => "converged",
            Self::IterationLimit => "iteration limit",
            Self::Ceiling => "ceiling",
            Self::Isolated => "isolated",
            Self::Planar => "planar",
            Self::PreservedEdge => "preserved edge",
        };
        f.write_str(name)
    }
}

/// Final shrinking ball for one (point, orientation) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedialBall {
    /// Ball center, or all-NaN when a ceiling ball is emitted as a sentinel.
    pub center: Point3<f64>,
    /// Radius of the ball around `center`, in `(0, initial_radius]`.
    pub radius: f64,
    /// Sample that constrained the ball at the last committed iteration.
    ///
    /// Early stops do not update it, so it can lag behind `center`.
    pub feature: Option<usize>,
    /// Why the iteration stopped.
    pub termination: Termination,
    /// Number of committed iterations.
    pub iterations: usize,
}

impl MedialBall {
    /// Returns true if the center is the NaN sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.center.x.is_nan()
    }
}

/// All balls of one orientation, in input point order.
#[derive(Debug, Clone, PartialEq)]
pub struct MedialPass {
    /// Side of the surface this pass was computed for.
    pub orientation: Orientation,
    /// One ball per input point.
    pub balls: Vec<MedialBall>,
}

impl MedialPass {
    /// Number of balls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.balls.len()
    }

    /// Returns true if the pass holds no balls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Ball centers in input order.
    #[must_use]
    pub fn centers(&self) -> Vec<Point3<f64>> {
        self.balls.iter().map(|b| b.center).collect()
    }

    /// Feature indices in input order.
    #[must_use]
    pub fn features(&self) -> Vec<Option<usize>> {
        self.balls.iter().map(|b| b.feature).collect()
    }

    /// Number of balls that stopped for the given reason.
    #[must_use]
    pub fn count(&self, termination: Termination) -> usize {
        self.balls
            .iter()
            .filter(|b| b.termination == termination)
            .count()
    }

    /// Number of balls that ended at the initial radius.
    #[must_use]
    pub fn ceiling_count(&self) -> usize {
        self.balls
            .iter()
            .filter(|b| b.termination.is_at_ceiling())
            .count()
    }

    /// Smallest radius of the pass, if any.
    #[must_use]
    pub fn min_radius(&self) -> Option<f64> {
        self.balls.iter().map(|b| b.radius).reduce(f64::min)
    }

    /// Mean radius over balls that shrank below the ceiling.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_shrunk_radius(&self) -> Option<f64> {
        let shrunk: Vec<f64> = self
            .balls
            .iter()
            .filter(|b| !b.termination.is_at_ceiling())
            .map(|b| b.radius)
            .collect();
        if shrunk.is_empty() {
            None
        } else {
            Some(shrunk.iter().sum::<f64>() / shrunk.len() as f64)
        }
    }
}

impl std::fmt::Display for MedialPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Medial Axis ({} pass):", self.orientation)?;
        writeln!(f, "  Points: {}", self.len())?;
        for termination in Termination::ALL {
            writeln!(f, "  {termination}: {}", self.count(termination))?;
        }
        if let Some(mean) = self.mean_shrunk_radius() {
            writeln!(f, "  Mean shrunk radius: {mean:.3}")?;
        }
        Ok(())
    }
}

/// Interior and exterior medial balls for a point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct MedialAxis {
    /// Balls shrunk against the given normals.
    pub inner: MedialPass,
    /// Balls shrunk against the negated normals.
    pub outer: MedialPass,
}

impl MedialAxis {
    /// The pass for the given orientation.
    #[must_use]
    pub const fn pass(&self, orientation: Orientation) -> &MedialPass {
        match orientation {
            Orientation::Inner => &self.inner,
            Orientation::Outer => &self.outer,
        }
    }
}

impl std::fmt::Display for MedialAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)?;
        write!(f, "{}", self.outer)
    }
}
