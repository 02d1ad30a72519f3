use chrono::{Duration, NaiveDate};
use cohort::market::default_universe;
use cohort::{ClusterReport, Pipeline, PipelineConfig, PriceBar, PriceSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Synthetic year of sessions for the default universe: each company follows
    // one of four sector factors plus its own noise, at its own price level.
    let mut rng = StdRng::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).ok_or("bad start date")?;
    let days = 250;

    let factors: Vec<Vec<f64>> = (0..4)
        .map(|_| (0..days).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect();

    let series: Vec<PriceSeries> = default_universe()
        .iter()
        .enumerate()
        .map(|(i, company)| {
            let sector = &factors[i % factors.len()];
            let level = rng.random_range(20.0..400.0);
            let bars = sector
                .iter()
                .enumerate()
                .map(|(d, f)| {
                    let delta = level * 0.01 * (f + 0.2 * rng.random_range(-1.0..1.0));
                    let open = level;
                    let close = open + delta;
                    let date = start + Duration::days(d as i64);
                    PriceBar::new(date, open, open.max(close), open.min(close), close)
                })
                .collect();
            PriceSeries::new(company.ticker, bars)
        })
        .collect();

    let config = PipelineConfig {
        k: 4,
        seed: Some(42),
        ..PipelineConfig::default()
    };
    let output = Pipeline::new(config)?.run_series(series)?;

    print!("{}", ClusterReport::from_output(&output));
    Ok(())
}
