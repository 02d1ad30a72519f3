//! Clustering of movement vectors.
//!
//! ## K-means
//!
//! Assign each point to the nearest centroid, move each centroid to the mean
//! of its points, repeat. The objective is the within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You know k in advance (use [`Kmeans::inertia_sweep`] or
//!   [`crate::metrics::silhouette_score`] to pick it)
//!
//! On unit-normalized movement vectors, squared Euclidean distance is
//! `2 - 2·cos θ`, so k-means groups symbols whose daily moves point the same
//! way, regardless of price level.
//!
//! ## Usage
//!
//! ```rust
//! use cohort::cluster::{Clustering, Kmeans};
//! use ndarray::array;
//!
//! let data = array![
//!     [0.0, 0.0],
//!     [0.1, 0.1],
//!     [10.0, 10.0],
//!     [10.1, 10.1],
//! ];
//!
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(data.view()).unwrap();
//! assert_eq!(labels[0], labels[1]);  // First two together
//! assert_ne!(labels[0], labels[2]);  // Separate from last two
//! ```

mod kmeans;
mod traits;

pub use kmeans::{Kmeans, KmeansFit, StopReason};
pub use traits::Clustering;
