//! Pipeline configuration: defaults, TOML loading, validation.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! k = 10
//! max_iterations = 1000
//! tolerance = 1e-4
//! n_restarts = 10
//! seed = 42
//! n_components = 2
//! cluster_space = "reduced"
//! fill = "missing"
//! parallel = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::Kmeans;
use crate::error::{Error, Result};
use crate::market::FillPolicy;

/// Which matrix k-means runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSpace {
    /// The PCA scores (normalize → PCA → k-means).
    #[default]
    Reduced,
    /// The unit-norm movement vectors; PCA is used only for plotting.
    Normalized,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Number of clusters, `1 ≤ k ≤ symbols`.
    pub k: usize,
    /// Iteration cap per k-means run.
    pub max_iterations: usize,
    /// Largest centroid displacement treated as converged.
    pub tolerance: f64,
    /// Independent k-means runs; the lowest inertia wins.
    pub n_restarts: usize,
    /// Seed for reproducible runs; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Principal components kept for the reduced view.
    pub n_components: usize,
    /// Matrix k-means runs on.
    pub cluster_space: ClusterSpace,
    /// Gap handling when aligning ragged series.
    pub fill: FillPolicy,
    /// Run restarts on the thread pool.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 1000,
            tolerance: 1e-4,
            n_restarts: 10,
            seed: None,
            n_components: 2,
            cluster_space: ClusterSpace::Reduced,
            fill: FillPolicy::Missing,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a TOML file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check ranges that do not depend on the data.
    ///
    /// `k ≤ symbols` is checked once the data is known.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::invalid("k", "must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations", "must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::invalid(
                "tolerance",
                format!("must be positive, got {}", self.tolerance),
            ));
        }
        if self.n_restarts == 0 {
            return Err(Error::invalid("n_restarts", "must be at least 1"));
        }
        if self.n_components == 0 {
            return Err(Error::invalid("n_components", "must be at least 1"));
        }
        Ok(())
    }

    /// The k-means clusterer these settings describe.
    pub fn kmeans(&self) -> Kmeans {
        Kmeans::new(self.k)
            .with_max_iter(self.max_iterations)
            .with_tol(self.tolerance)
            .with_n_init(self.n_restarts)
            .with_seed_opt(self.seed)
            .with_parallel(self.parallel)
    }
}
