//! End-to-end run: prices → movements → unit vectors → PCA → k-means.
//!
//! A run is a pure function of the price table and the config. Nothing is
//! cached between runs.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::Serialize;
use tracing::info;

use crate::cluster::{KmeansFit, StopReason};
use crate::config::{ClusterSpace, PipelineConfig};
use crate::error::{Diagnostic, Error, Result};
use crate::features::{Dataset, FeatureBuilder};
use crate::market::{PriceSeries, PriceTable};
use crate::normalize::Normalizer;
use crate::reduce::{Pca, PcaModel};

/// Cluster id per symbol. Built once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    symbols: Vec<String>,
    labels: Vec<usize>,
    k: usize,
}

impl ClusterAssignment {
    /// Pair symbols with labels. Every label must be below `k`.
    pub fn new(symbols: Vec<String>, labels: Vec<usize>, k: usize) -> Result<Self> {
        if symbols.len() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: symbols.len(),
                found: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
            return Err(Error::invalid("labels", format!("label {bad} not below k = {k}")));
        }
        Ok(Self { symbols, labels, k })
    }

    /// Number of clusters, including empty ones.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbols were clustered.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Cluster of `symbol`.
    pub fn get(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.labels[i])
    }

    /// Symbols in row order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Labels in row order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// `(symbol, cluster)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.symbols
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
    }

    /// Members of one cluster in row order.
    pub fn members(&self, cluster: usize) -> Vec<&str> {
        self.iter()
            .filter(|&(_, c)| c == cluster)
            .map(|(s, _)| s)
            .collect()
    }

    /// Non-empty clusters and their members.
    pub fn clusters(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut out: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (symbol, cluster) in self.iter() {
            out.entry(cluster).or_default().push(symbol);
        }
        out
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Cluster id per symbol.
    pub assignment: ClusterAssignment,
    /// Unit-norm movement vectors, same row order.
    pub normalized: Dataset,
    /// PCA scores (`symbols × n_components`), same row order.
    pub reduced: Array2<f64>,
    /// Fitted projection.
    pub pca: PcaModel,
    /// Winning k-means run (centroids live in the clustered space).
    pub kmeans: KmeansFit,
    /// Non-fatal conditions from every stage.
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineOutput {
    /// Final inertia of the winning run.
    pub fn inertia(&self) -> f64 {
        self.kmeans.inertia()
    }

    /// Centroids of the winning run.
    pub fn centroids(&self) -> &Array2<f64> {
        self.kmeans.centroids()
    }

    /// False when the winning run stopped at the iteration cap.
    pub fn converged(&self) -> bool {
        self.kmeans.stop_reason() != StopReason::IterationCap
    }
}

/// Runs the stages in order under one config.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline; the config is validated up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The config in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Align ragged series with the configured fill policy, then run.
    pub fn run_series(&self, series: Vec<PriceSeries>) -> Result<PipelineOutput> {
        let table = PriceTable::align(series, self.config.fill)?;
        self.run(&table)
    }

    /// Run on an aligned price table.
    pub fn run(&self, table: &PriceTable) -> Result<PipelineOutput> {
        let mut diagnostics = Vec::new();

        let (movements, imputed) = FeatureBuilder::new().build(table)?;
        diagnostics.extend(imputed);
        self.run_features(&movements, diagnostics)
    }

    /// Run from movement vectors onward.
    pub fn run_dataset(&self, movements: &Dataset) -> Result<PipelineOutput> {
        self.run_features(movements, Vec::new())
    }

    fn run_features(
        &self,
        movements: &Dataset,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Result<PipelineOutput> {
        let kmeans = self.config.kmeans();
        kmeans.validate(movements.len())?;

        let (normalized, zero_rows) = Normalizer::new().transform_dataset(movements);
        diagnostics.extend(zero_rows);

        let (pca, reduced) = Pca::new(self.config.n_components).fit_transform(normalized.matrix())?;
        info!(
            components = self.config.n_components,
            explained = ?pca.explained_variance_ratio().to_vec(),
            "reduced movement vectors"
        );

        let fit = match self.config.cluster_space {
            ClusterSpace::Reduced => kmeans.fit(reduced.view())?,
            ClusterSpace::Normalized => kmeans.fit(normalized.matrix())?,
        };
        diagnostics.extend(fit.diagnostics().iter().cloned());

        let assignment = ClusterAssignment::new(
            normalized.symbols().to_vec(),
            fit.labels().to_vec(),
            self.config.k,
        )?;

        Ok(PipelineOutput {
            assignment,
            normalized,
            reduced,
            pca,
            kmeans: fit,
            diagnostics,
        })
    }
}
