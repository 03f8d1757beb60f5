//! Utility functions for the macid crate

use rand::{Rng, distr::StandardUniform, prelude::IndexedRandom};

/// Calculate Shannon entropy from a probability distribution.
///
/// The Shannon entropy is calculated as: H = -Σ(p * ln(p)) for p > 0
///
/// # Examples
///
/// ```
/// use macid::utils::shannon_entropy;
///
/// // Uniform distribution over 2 outcomes
/// let entropy = shannon_entropy(vec![0.5, 0.5]);
/// assert!((entropy - std::f64::consts::LN_2).abs() < 0.001);
///
/// // Deterministic distribution (zero entropy)
/// let entropy = shannon_entropy(vec![1.0, 0.0, 0.0]);
/// assert!(entropy.abs() < 0.001);
/// ```
pub fn shannon_entropy<I>(probabilities: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    probabilities
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Normalize weights to probabilities that sum to 1.0.
///
/// # Returns
///
/// - `Some(Vec<f64>)` containing normalized probabilities if total weight is positive
/// - `None` if total weight is zero, negative, or not finite
///
/// # Examples
///
/// ```
/// use macid::utils::normalize_weights;
///
/// let normalized = normalize_weights(vec![1.0, 2.0, 1.0]).unwrap();
/// assert_eq!(normalized, vec![0.25, 0.5, 0.25]);
///
/// let normalized = normalize_weights(vec![0.0, 0.0]);
/// assert_eq!(normalized, None);
/// ```
pub fn normalize_weights<I>(weights: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = f64>,
{
    let weights_vec: Vec<f64> = weights.into_iter().collect();
    if weights_vec.is_empty() {
        return None;
    }

    let sum: f64 = weights_vec.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }

    Some(weights_vec.iter().map(|&w| w / sum).collect())
}

/// Performs weighted random sampling from a collection of items.
///
/// # Behavior
///
/// - If all weights are zero or negative, falls back to uniform random selection
/// - The last item is returned as a fallback if the threshold doesn't cross
///   zero (numerical stability)
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use macid::utils::weighted_sample;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let items = vec![("a", 1.0), ("b", 2.0), ("c", 1.0)];
/// let sampled = weighted_sample(&mut rng, &items);
/// assert!(sampled.is_some());
/// ```
pub fn weighted_sample<R, T, W>(rng: &mut R, items: &[(T, W)]) -> Option<T>
where
    R: Rng,
    T: Clone,
    W: Into<f64> + Copy,
{
    if items.is_empty() {
        return None;
    }

    let total: f64 = items.iter().map(|(_, w)| (*w).into()).sum();
    if total <= 0.0 {
        return items.choose(rng).map(|(item, _)| item.clone());
    }

    let mut threshold = rng.sample::<f64, _>(StandardUniform) * total;
    for (item, weight) in items {
        let w = (*weight).into();
        if threshold < w {
            return Some(item.clone());
        }
        threshold -= w;
    }

    items.last().map(|(item, _)| item.clone())
}

/// Enumerate the cartesian product of several finite domains.
///
/// Produces assignments in lexicographic order with the *last* domain varying
/// fastest, matching row-major factor layout. An empty list of domains yields
/// a single empty assignment (the root-node case).
///
/// # Examples
///
/// ```
/// use macid::utils::cartesian_product;
///
/// let rows = cartesian_product(&[vec![0, 1], vec![0, 1, 2]]);
/// assert_eq!(rows.len(), 6);
/// assert_eq!(rows[0], vec![0, 0]);
/// assert_eq!(rows[5], vec![1, 2]);
/// ```
pub fn cartesian_product<T: Clone>(domains: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut rows: Vec<Vec<T>> = vec![Vec::new()];
    for domain in domains {
        let mut next = Vec::with_capacity(rows.len() * domain.len());
        for row in &rows {
            for value in domain {
                let mut extended = row.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_weighted_sample_empty() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<(i32, f64)> = vec![];
        assert_eq!(weighted_sample(&mut rng, &items), None);
    }

    #[test]
    fn test_weighted_sample_single_item() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = vec![("a", 1.0)];
        assert_eq!(weighted_sample(&mut rng, &items), Some("a"));
    }

    #[test]
    fn test_weighted_sample_zero_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = vec![("a", 0.0), ("b", 0.0)];
        // Should fall back to uniform sampling
        assert!(weighted_sample(&mut rng, &items).is_some());
    }

    #[test]
    fn test_weighted_sample_deterministic() {
        let items = vec![("a", 1.0), ("b", 2.0), ("c", 1.0)];

        let mut rng1 = StdRng::seed_from_u64(12345);
        let result1 = weighted_sample(&mut rng1, &items);

        let mut rng2 = StdRng::seed_from_u64(12345);
        let result2 = weighted_sample(&mut rng2, &items);

        assert_eq!(result1, result2);
    }

    #[test]
    fn normalize_weights_returns_none_for_zero_total() {
        assert!(normalize_weights(vec![0.0, 0.0]).is_none());
    }

    #[test]
    fn cartesian_product_of_nothing_is_one_empty_row() {
        let rows: Vec<Vec<i64>> = cartesian_product(&[]);
        assert_eq!(rows, vec![Vec::<i64>::new()]);
    }

    #[test]
    fn cartesian_product_last_domain_varies_fastest() {
        let rows = cartesian_product(&[vec!['a', 'b'], vec!['x', 'y']]);
        assert_eq!(
            rows,
            vec![
                vec!['a', 'x'],
                vec!['a', 'y'],
                vec!['b', 'x'],
                vec!['b', 'y'],
            ]
        );
    }
}
