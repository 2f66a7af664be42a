//! Jain's fairness index over arbitrary value sets, and the wait-time variant
//! used for per-tenant fairness reporting.

const EPSILON: f64 = 1e-6;

/// `F(x) = (Σxᵢ)² / (n·Σxᵢ²)`. Returns `0.0` for an empty slice or when every
/// value is zero (denominator would be zero).
pub fn jains_fairness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let numerator = values.iter().sum::<f64>().powi(2);
    let denominator = values.len() as f64 * values.iter().map(|v| v * v).sum::<f64>();
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Fairness over per-tenant average wait times. Wait time is inverted
/// (`1 / (wait + epsilon)`) before feeding Jain's formula, so tenants with
/// lower average wait score as more "favored" and equal favor across tenants
/// scores as maximally fair.
pub fn fairness_from_wait_times(avg_wait: &std::collections::HashMap<String, f64>) -> f64 {
    let inverted: Vec<f64> = avg_wait.values().map(|w| 1.0 / (w + EPSILON)).collect();
    jains_fairness(&inverted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equal_values_are_maximally_fair() {
        let f = jains_fairness(&[2.0, 2.0, 2.0]);
        assert!((f - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(jains_fairness(&[]), 0.0);
    }

    #[test]
    fn all_zero_is_zero() {
        assert_eq!(jains_fairness(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn skewed_values_are_less_fair_than_equal() {
        let fair = jains_fairness(&[1.0, 1.0, 1.0, 1.0]);
        let skewed = jains_fairness(&[1.0, 1.0, 1.0, 100.0]);
        assert!(skewed < fair);
    }

    #[test]
    fn wait_times_equal_is_maximally_fair() {
        let waits = HashMap::from([("a".to_string(), 3.0), ("b".to_string(), 3.0)]);
        let f = fairness_from_wait_times(&waits);
        assert!((f - 1.0).abs() < 1e-6);
    }
}
