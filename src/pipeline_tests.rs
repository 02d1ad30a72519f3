#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    use crate::config::{ClusterSpace, PipelineConfig};
    use crate::error::{Diagnostic, Error};
    use crate::features::Dataset;
    use crate::market::{FillPolicy, PriceBar, PriceSeries, PriceTable};
    use crate::metrics::ari;
    use crate::pipeline::{ClusterAssignment, Pipeline};
    use crate::report::ClusterReport;
    use crate::Result;

    const DAYS: usize = 60;

    fn pattern(group: usize, day: usize) -> f64 {
        let t = day as f64;
        match group {
            0 => (t * 0.7).sin(),
            1 => (t * 1.3).cos(),
            _ => (day % 3) as f64 - 1.0,
        }
    }

    /// Symbol `G{g}S{s}` moves like group `g`'s pattern, at its own price scale.
    fn synthetic_series(groups: usize, per_group: usize) -> Vec<PriceSeries> {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let mut out = Vec::new();
        for g in 0..groups {
            for s in 0..per_group {
                let id = g * per_group + s;
                let scale = 1.0 + id as f64 * 0.75;
                let bars = (0..DAYS)
                    .map(|j| {
                        let noise = (((id * 7 + j * 13) % 11) as f64 - 5.0) / 5.0 * 0.05;
                        let open = 100.0 * scale;
                        let close = open + scale * (pattern(g, j) + noise);
                        let date = start + Duration::days(j as i64);
                        PriceBar::new(date, open, open.max(close), open.min(close), close)
                    })
                    .collect();
                out.push(PriceSeries::new(format!("G{g}S{s}"), bars));
            }
        }
        out
    }

    fn config(k: usize, space: ClusterSpace) -> PipelineConfig {
        PipelineConfig {
            k,
            seed: Some(42),
            cluster_space: space,
            ..PipelineConfig::default()
        }
    }

    fn assert_groups_recovered(assignment: &ClusterAssignment, groups: usize, per_group: usize) {
        let mut seen = HashSet::new();
        for g in 0..groups {
            let first = assignment.get(&format!("G{g}S0")).unwrap();
            for s in 1..per_group {
                assert_eq!(assignment.get(&format!("G{g}S{s}")), Some(first), "group {g}");
            }
            assert!(seen.insert(first), "group {g} shares a cluster");
        }
    }

    #[test]
    fn test_recovers_groups_in_reduced_space() -> Result<()> {
        let pipeline = Pipeline::new(config(3, ClusterSpace::Reduced))?;
        let out = pipeline.run_series(synthetic_series(3, 4))?;

        assert_eq!(out.reduced.dim(), (12, 2));
        assert_groups_recovered(&out.assignment, 3, 4);
        assert!(out.converged());
        Ok(())
    }

    #[test]
    fn test_recovers_groups_in_normalized_space() -> Result<()> {
        let pipeline = Pipeline::new(config(3, ClusterSpace::Normalized))?;
        let out = pipeline.run_series(synthetic_series(3, 4))?;

        assert_eq!(out.centroids().ncols(), DAYS);
        assert_groups_recovered(&out.assignment, 3, 4);
        Ok(())
    }

    #[test]
    fn test_every_symbol_assigned_once() -> Result<()> {
        let out = Pipeline::new(config(4, ClusterSpace::Reduced))?.run_series(synthetic_series(3, 4))?;

        let members: Vec<&str> = out.assignment.clusters().into_values().flatten().collect();
        let unique: HashSet<&str> = members.iter().copied().collect();
        assert_eq!(members.len(), 12);
        assert_eq!(unique.len(), 12);
        assert!(out.assignment.labels().iter().all(|&l| l < 4));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_result() -> Result<()> {
        let pipeline = Pipeline::new(config(3, ClusterSpace::Reduced))?;
        let a = pipeline.run_series(synthetic_series(3, 3))?;
        let b = pipeline.run_series(synthetic_series(3, 3))?;

        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.centroids(), b.centroids());
        assert_eq!(a.inertia(), b.inertia());
        Ok(())
    }

    #[test]
    fn test_groups_stable_across_seeds() -> Result<()> {
        let truth: Vec<usize> = (0..12).map(|i| i / 4).collect();
        for seed in [1, 7, 99] {
            let cfg = PipelineConfig {
                seed: Some(seed),
                ..config(3, ClusterSpace::Reduced)
            };
            let out = Pipeline::new(cfg)?.run_series(synthetic_series(3, 4))?;
            assert!((ari(out.assignment.labels(), &truth) - 1.0).abs() < 1e-12, "seed {seed}");
        }
        Ok(())
    }

    #[test]
    fn test_run_dataset_from_movements() -> Result<()> {
        let movements = Dataset::new(
            vec!["UP".into(), "UP2".into(), "DOWN".into(), "DOWN2".into()],
            array![
                [1.0, 0.5, -0.2],
                [2.0, 1.1, -0.4],
                [-1.0, 0.3, 0.8],
                [-3.0, 0.8, 2.5]
            ],
        )?;

        let out = Pipeline::new(config(2, ClusterSpace::Normalized))?.run_dataset(&movements)?;

        assert_eq!(out.assignment.symbols(), movements.symbols());
        assert_eq!(out.assignment.get("UP"), out.assignment.get("UP2"));
        assert_eq!(out.assignment.get("DOWN"), out.assignment.get("DOWN2"));
        assert_ne!(out.assignment.get("UP"), out.assignment.get("DOWN"));
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_run_dataset_needs_unique_symbols() {
        let err = Dataset::new(
            vec!["A".into(), "A".into(), "B".into()],
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        )
        .and_then(|ds| Pipeline::new(config(3, ClusterSpace::Reduced))?.run_dataset(&ds))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "symbols", .. }));
    }

    #[test]
    fn test_gaps_and_flat_symbol_are_diagnostics() -> Result<()> {
        let mut series = synthetic_series(2, 3);
        series[0].bars.remove(5);
        let flat_bars = series[1]
            .bars
            .iter()
            .map(|b| PriceBar::new(b.date, 50.0, 50.0, 50.0, 50.0))
            .collect();
        series.push(PriceSeries::new("FLAT", flat_bars));

        let out = Pipeline::new(config(2, ClusterSpace::Reduced))?.run_series(series)?;

        assert!(out.diagnostics.contains(&Diagnostic::ImputedCells { count: 1 }));
        assert!(out
            .diagnostics
            .contains(&Diagnostic::ZeroNormRows { rows: vec![6] }));
        assert!(out.assignment.get("FLAT").is_some());
        Ok(())
    }

    #[test]
    fn test_forward_fill_removes_imputation() -> Result<()> {
        let mut series = synthetic_series(2, 2);
        series[1].bars.remove(10);
        let table = PriceTable::align(series, FillPolicy::ForwardFill)?;

        let out = Pipeline::new(config(2, ClusterSpace::Reduced))?.run(&table)?;

        assert!(!out
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ImputedCells { .. })));
        Ok(())
    }

    #[test]
    fn test_k_larger_than_universe_fails_fast() {
        let err = Pipeline::new(config(20, ClusterSpace::Reduced))
            .and_then(|p| p.run_series(synthetic_series(2, 2)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidClusterCount { requested: 20, n_items: 4 }));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_k_equals_universe_gives_singletons() -> Result<()> {
        let out = Pipeline::new(config(6, ClusterSpace::Normalized))?.run_series(synthetic_series(2, 3))?;

        let sizes: Vec<usize> = out.assignment.clusters().values().map(Vec::len).collect();
        assert_eq!(sizes, vec![1; 6]);
        assert_eq!(out.inertia(), 0.0);
        Ok(())
    }

    #[test]
    fn test_report_sorted_by_cluster_then_symbol() -> Result<()> {
        let out = Pipeline::new(config(3, ClusterSpace::Reduced))?.run_series(synthetic_series(3, 2))?;
        let report = ClusterReport::from_output(&out);

        assert_eq!(report.rows.len(), 6);
        for w in report.rows.windows(2) {
            assert!((w[0].cluster, &w[0].symbol) <= (w[1].cluster, &w[1].symbol));
        }
        assert!(report.rows.iter().all(|r| r.coords.len() == 2));

        let text = report.to_string();
        assert!(text.starts_with("cluster"));
        assert!(text.contains("G1S0"));
        Ok(())
    }

    #[test]
    fn test_assignment_rejects_out_of_range_label() {
        let err = ClusterAssignment::new(vec!["A".into(), "B".into()], vec![0, 2], 2).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "labels", .. }));
    }
}
