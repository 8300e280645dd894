//! Cross-reference statistics.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub variance_percent: Option<f64>,
}

/// Requires >= 2 values. `variancePercent` is undefined (None) when the
/// mean is zero.
pub fn compute(values: &[f64]) -> FieldStats {
    let n = values.len() as f64;
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = values.iter().sum::<f64>() / n;
    let median = if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let variance_percent = if mean == 0.0 {
        None
    } else {
        Some((max - min) / mean.abs())
    };

    FieldStats {
        min,
        max,
        mean,
        median,
        std_dev,
        variance_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_expected_statistics() {
        let stats = compute(&[1_200_000.0, 1_080_000.0]);
        assert_eq!(stats.min, 1_080_000.0);
        assert_eq!(stats.max, 1_200_000.0);
        assert_eq!(stats.mean, 1_140_000.0);
        assert!((stats.variance_percent.unwrap() - 0.10526315789).abs() < 1e-6);
    }

    #[test]
    fn zero_mean_has_undefined_variance() {
        let stats = compute(&[-5.0, 5.0]);
        assert_eq!(stats.mean, 0.0);
        assert!(stats.variance_percent.is_none());
    }
}
