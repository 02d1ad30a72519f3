//! # cohort
//!
//! Groups equities by how their prices move within the trading day. Each
//! symbol becomes a vector of daily `close - open` deltas over a common date
//! index; vectors are scaled to unit length, projected onto their leading
//! principal components, and partitioned with k-means++.
//!
//! Picking one symbol per cluster gives a portfolio with less correlated
//! intraday risk.
//!
//! ```text
//! PriceTable ─▶ FeatureBuilder ─▶ Normalizer ─▶ Pca ─▶ Kmeans ─▶ ClusterAssignment
//! ```
//!
//! Fetching prices and drawing plots are left to the caller.
//!
//! **Default build** runs k-means restarts on the rayon pool (`parallel`).
//! The `cli` feature adds CSV loading and the `cohort` binary.

pub mod cluster;
pub mod config;
/// Error types used across `cohort`.
pub mod error;
pub mod features;
pub mod market;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod reduce;
pub mod report;

#[cfg(test)]
mod pipeline_tests;

pub use cluster::{Clustering, Kmeans, KmeansFit, StopReason};
pub use config::{ClusterSpace, PipelineConfig};
pub use error::{Diagnostic, Error, Result};
pub use features::{Dataset, FeatureBuilder};
pub use market::{FillPolicy, PriceBar, PriceSeries, PriceTable, Session};
pub use metrics::{ari, silhouette_samples, silhouette_score};
pub use normalize::Normalizer;
pub use pipeline::{ClusterAssignment, Pipeline, PipelineOutput};
pub use reduce::{Pca, PcaModel};
pub use report::ClusterReport;
