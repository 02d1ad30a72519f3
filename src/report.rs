//! Tabular view of a run for the downstream reporter.

use std::fmt;

use serde::Serialize;

use crate::error::Diagnostic;
use crate::market::Company;
use crate::pipeline::PipelineOutput;

/// One symbol in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Cluster id.
    pub cluster: usize,
    /// Symbol as given in the input.
    pub symbol: String,
    /// Company name when the symbol is in the default universe.
    pub name: Option<String>,
    /// Coordinates in the reduced (PCA) plane.
    pub coords: Vec<f64>,
}

/// Rows sorted by cluster, then symbol, plus run-level figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    /// Sorted rows.
    pub rows: Vec<ReportRow>,
    /// Final inertia.
    pub inertia: f64,
    /// Variance share of each principal component.
    pub explained_variance_ratio: Vec<f64>,
    /// Whether the winning run converged before the cap.
    pub converged: bool,
    /// Non-fatal conditions.
    pub diagnostics: Vec<Diagnostic>,
}

impl ClusterReport {
    /// Build from a pipeline run.
    pub fn from_output(output: &PipelineOutput) -> Self {
        let mut rows: Vec<ReportRow> = output
            .assignment
            .iter()
            .enumerate()
            .map(|(i, (symbol, cluster))| ReportRow {
                cluster,
                symbol: symbol.to_string(),
                name: Company::by_ticker(symbol).map(|c| c.name.to_string()),
                coords: output.reduced.row(i).to_vec(),
            })
            .collect();
        rows.sort_by(|a, b| (a.cluster, &a.symbol).cmp(&(b.cluster, &b.symbol)));

        Self {
            rows,
            inertia: output.inertia(),
            explained_variance_ratio: output.pca.explained_variance_ratio().to_vec(),
            converged: output.converged(),
            diagnostics: output.diagnostics.clone(),
        }
    }
}

impl fmt::Display for ClusterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.name.as_deref().unwrap_or(&r.symbol).len())
            .max()
            .unwrap_or(0)
            .max("company".len());

        writeln!(f, "{:>7}  {:<8}  {:<width$}", "cluster", "symbol", "company")?;
        for row in &self.rows {
            let name = row.name.as_deref().unwrap_or(&row.symbol);
            writeln!(f, "{:>7}  {:<8}  {:<width$}", row.cluster, row.symbol, name)?;
        }
        writeln!(f)?;
        writeln!(f, "inertia: {:.6}", self.inertia)?;
        let ratios: Vec<String> = self
            .explained_variance_ratio
            .iter()
            .map(|r| format!("{:.1}%", r * 100.0))
            .collect();
        writeln!(f, "explained variance: {}", ratios.join(", "))?;
        if !self.converged {
            writeln!(f, "warning: k-means stopped at the iteration cap")?;
        }
        for d in &self.diagnostics {
            writeln!(f, "note: {d}")?;
        }
        Ok(())
    }
}
