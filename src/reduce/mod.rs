//! Dimensionality reduction.
//!
//! Normalized movement vectors live in a space with one axis per trading day.
//! Projecting them onto their two leading principal components gives a plane
//! in which cluster separation can be plotted, and a low-dimensional input
//! on which k-means is less affected by day-to-day noise.
//!
//! ```rust
//! use cohort::reduce::Pca;
//! use ndarray::array;
//!
//! let data = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
//! let (model, scores) = Pca::new(2).fit_transform(data.view()).unwrap();
//! assert_eq!(scores.dim(), (4, 2));
//! assert!(model.explained_variance_ratio().sum() <= 1.0 + 1e-12);
//! ```

mod pca;

pub use pca::{Pca, PcaModel};
