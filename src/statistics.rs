//! Survey-statistics sample size derivation.

/// Z-value for the supported confidence levels. Anything else falls back to 95%.
fn z_value(confidence_level: u32) -> f64 {
    match confidence_level {
        90 => 1.645,
        95 => 1.96,
        99 => 2.576,
        _ => 1.96,
    }
}

/// Required sample size for the given confidence level and margin of error.
///
/// Uses the infinite-population formula n0 = Z^2 * p * (1 - p) / e^2 and, when a
/// population size is supplied, the finite-population correction
/// n = n0 * N / (n0 + N - 1). The caller must supply a margin of error > 0.
pub fn calculate_sample_size(
    confidence_level: u32,
    margin_of_error: f64,
    population_size: Option<u64>,
    proportion: f64,
) -> u64 {
    let z = z_value(confidence_level);
    let p = proportion;
    let e = margin_of_error;

    let mut sample_size = z.powi(2) * p * (1.0 - p) / e.powi(2);

    if let Some(n) = population_size {
        let n = n as f64;
        sample_size = (sample_size * n) / (sample_size + n - 1.0);
    }

    sample_size.ceil() as u64
}
