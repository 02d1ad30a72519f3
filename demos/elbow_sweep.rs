use cohort::{silhouette_score, Kmeans, Normalizer, Pca};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 30 movement vectors drawn around 3 hidden patterns; the elbow should sit at k = 3.
    let mut rng = StdRng::seed_from_u64(11);
    let days = 120;
    let patterns: Vec<Vec<f64>> = (0..3)
        .map(|_| (0..days).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect();

    let movements = Array2::from_shape_fn((30, days), |(i, d)| {
        patterns[i % 3][d] + 0.3 * ((i * 31 + d * 17) % 13) as f64 / 13.0
    });

    let (unit, _zero_rows) = Normalizer::new().transform(movements.view());
    let (pca, reduced) = Pca::new(2).fit_transform(unit.view())?;
    println!(
        "explained variance ratio: {:?}",
        pca.explained_variance_ratio().to_vec()
    );

    let kmeans = Kmeans::new(1).with_seed(42).with_n_init(5);
    println!("{:>3}  {:>10}  {:>10}", "k", "inertia", "silhouette");
    for (k, inertia) in kmeans.inertia_sweep(reduced.view(), 1..=8)? {
        let silhouette = if k > 1 {
            let labels = Kmeans::new(k).with_seed(42).with_n_init(5).fit(reduced.view())?;
            format!("{:.3}", silhouette_score(reduced.view(), labels.labels())?)
        } else {
            "-".to_string()
        };
        println!("{k:>3}  {inertia:>10.4}  {silhouette:>10}");
    }
    Ok(())
}
