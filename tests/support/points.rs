//! Deterministic point generators for integration tests.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generate `n` random points uniformly in the square `[0, span) × [0, span)`.
///
/// Seeded, so every run sees the same cloud. Exact coordinate duplicates are
/// astronomically unlikely but filtered anyway to keep ingestion happy.
pub fn random_points(n: usize, span: f64, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points: Vec<(f64, f64)> = Vec::with_capacity(n);
    while points.len() < n {
        let candidate = (rng.gen_range(0.0..span), rng.gen_range(0.0..span));
        if !points.iter().any(|&p| p == candidate) {
            points.push(candidate);
        }
    }
    points
}

/// Generate an `n × n` integer lattice, a worst case for cocircular
/// tie-breaking (every unit square is cocircular).
pub fn lattice_points(n: usize) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            points.push((i as f64, j as f64));
        }
    }
    points
}

/// `n` distinct points on a horizontal line: a fully collinear input.
pub fn collinear_points(n: usize) -> Vec<(f64, f64)> {
    (0..n).map(|i| (i as f64, 5.0)).collect()
}
