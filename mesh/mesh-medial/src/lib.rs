//! Medial axis approximation for oriented point clouds.
//!
//! This crate computes interior and exterior medial balls for a point cloud
//! with per-point normals. The medial axis is the locus of centers of
//! maximal empty balls; its points carry thickness and skeleton information
//! for the sampled surface.
//!
//! # Algorithm
//!
//! Each point is handled by the shrinking-ball method: a large ball tangent
//! to the surface at the point is repeatedly shrunk until no other sample
//! lies inside it. The last sample that constrained the ball is reported as
//! its feature point. Optional denoising rules keep noisy samples from
//! collapsing balls near flat regions and sharp features.
//!
//! The interior pass uses the normals as given; the exterior pass negates
//! them. Points are processed in parallel against a shared k-d tree.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - CLI tools
//! - Servers
//! - Batch processing pipelines
//!
//! # Example
//!
//! ```
//! use mesh_medial::{compute_medial_axis, MedialParams};
//! use nalgebra::{Point3, Vector3};
//!
//! let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)];
//! let normals = vec![Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0)];
//!
//! let axis = compute_medial_axis(&points, &normals, &MedialParams::default()).unwrap();
//!
//! println!("Interior radius: {:.3}", axis.inner.balls[0].radius);
//! println!("Exterior ceiling balls: {}", axis.outer.ceiling_count());
//! ```
//!
//! # Use Cases
//!
//! - **Thickness Estimation**: Local feature size from interior ball radii
//! - **Skeletonization**: Interior centers approximate the shape skeleton
//! - **Denoising Diagnostics**: Termination reasons per point

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
mod error;
pub mod geometry;
pub mod io;
mod params;
pub mod pipeline;
mod result;
pub mod shrinking_ball;
pub mod spatial;

// Re-export main types and functions
pub use batch::{compute_medial_axis, shrink_balls};
pub use error::{MedialError, MedialResult};
pub use params::MedialParams;
pub use pipeline::{MedialPaths, run};
pub use result::{MedialAxis, MedialBall, MedialPass, Orientation, Termination};
pub use shrinking_ball::shrink_ball;
pub use spatial::{KdTreeIndex, Neighbor, SpatialIndex};
