//! Array file I/O for point clouds and medial axis outputs.
//!
//! Point clouds are exchanged as NumPy `.npy` files so they can be produced
//! and inspected with standard scientific tooling.

pub mod npy;

pub use npy::{load_indices, load_points, load_vectors, save_indices, save_points};
