use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cohort::market::csv::read_series_path;
use cohort::{ClusterReport, ClusterSpace, FillPolicy, Pipeline, PipelineConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cohort", about = "Cluster equities by intraday price movement")]
struct Cli {
    /// CSV with columns symbol,date,open,high,low,close
    #[arg(short, long)]
    prices: PathBuf,

    /// TOML config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of clusters
    #[arg(short)]
    k: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Independent k-means restarts
    #[arg(long)]
    restarts: Option<usize>,

    /// Space k-means runs in
    #[arg(long, value_enum)]
    space: Option<Space>,

    /// Gap handling for ragged series
    #[arg(long, value_enum)]
    fill: Option<Fill>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Space {
    Reduced,
    Normalized,
}

#[derive(Clone, Copy, ValueEnum)]
enum Fill {
    Missing,
    ForwardFill,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(k) = self.k {
            cfg.k = k;
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(restarts) = self.restarts {
            cfg.n_restarts = restarts;
        }
        if let Some(space) = self.space {
            cfg.cluster_space = match space {
                Space::Reduced => ClusterSpace::Reduced,
                Space::Normalized => ClusterSpace::Normalized,
            };
        }
        if let Some(fill) = self.fill {
            cfg.fill = match fill {
                Fill::Missing => FillPolicy::Missing,
                Fill::ForwardFill => FillPolicy::ForwardFill,
            };
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.pipeline_config()?;
    let pipeline = Pipeline::new(config).context("invalid configuration")?;

    let series = read_series_path(&cli.prices)
        .with_context(|| format!("reading prices from {}", cli.prices.display()))?;
    info!(symbols = series.len(), path = %cli.prices.display(), "loaded price series");

    let output = pipeline.run_series(series).context("clustering failed")?;
    let report = ClusterReport::from_output(&output);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
