//! Pure combination of per-shard `(count, vector)` pairs.

use crate::error::{FedErr, Result};

/// Combines per-shard means into the weighted global mean:
/// `sum(count_i * vector_i) / sum(count_i)`.
///
/// # Arguments
/// * `pairs` - One `(sample count, mean vector)` pair per shard.
///
/// # Returns
/// `EmptyInput` if `pairs` is empty or carries zero total weight,
/// `ShapeMismatch` if the vectors disagree in length.
pub fn combine_means(pairs: &[(u64, Vec<f32>)]) -> Result<Vec<f32>> {
    weighted_mean(pairs)
}

/// Combines per-shard variances into the pooled standard deviation:
/// `sqrt(sum(count_i * variance_i) / sum(count_i))`.
///
/// The vectors must be local variances *around the already-broadcast global
/// mean*, not around each shard's own mean. Because every shard centers on
/// the same value, the pooled result is mathematically exact. The caller is
/// responsible for enforcing that ordering (mean pass first, then variance
/// pass).
pub fn combine_stds(pairs: &[(u64, Vec<f32>)]) -> Result<Vec<f32>> {
    let mut pooled = weighted_mean(pairs)?;
    for component in &mut pooled {
        *component = component.sqrt();
    }
    Ok(pooled)
}

/// Remaps standard-deviation components of exactly zero to one, so constant
/// features never divide by zero during normalization.
pub fn guard_zero_std(std: &mut [f32]) {
    for component in std {
        if *component == 0.0 {
            *component = 1.0;
        }
    }
}

fn weighted_mean(pairs: &[(u64, Vec<f32>)]) -> Result<Vec<f32>> {
    let Some((_, first)) = pairs.first() else {
        return Err(FedErr::EmptyInput);
    };

    let total: u64 = pairs.iter().map(|(count, _)| count).sum();
    if total == 0 {
        return Err(FedErr::EmptyInput);
    }

    let mut acc = vec![0.0_f64; first.len()];
    for (count, vector) in pairs {
        if vector.len() != acc.len() {
            return Err(FedErr::ShapeMismatch {
                what: "statistic vector",
                got: vector.len(),
                expected: acc.len(),
            });
        }
        for (dst, &value) in acc.iter_mut().zip(vector) {
            *dst += *count as f64 * value as f64;
        }
    }

    Ok(acc.into_iter().map(|v| (v / total as f64) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_mean_matches_closed_form() {
        let pairs = vec![(1_u64, vec![1.0, 10.0]), (3, vec![5.0, 2.0])];
        let mean = combine_means(&pairs).unwrap();
        // (1*1 + 3*5) / 4 = 4, (1*10 + 3*2) / 4 = 4
        assert_eq!(mean, vec![4.0, 4.0]);
    }

    #[test]
    fn pooled_std_matches_union_of_shards() {
        // Shard A: [1, 3], shard B: [5, 7, 9, 11]. Union mean = 6.
        let mu = 6.0_f32;
        let var_a = ((1.0 - mu).powi(2) + (3.0 - mu).powi(2)) / 2.0;
        let var_b = ((5.0 - mu).powi(2)
            + (7.0 - mu).powi(2)
            + (9.0 - mu).powi(2)
            + (11.0 - mu).powi(2))
            / 4.0;
        let pairs = vec![(2_u64, vec![var_a]), (4, vec![var_b])];

        let pooled = combine_stds(&pairs).unwrap();

        // Closed form over the union [1, 3, 5, 7, 9, 11], centered on 6.
        let union = [1.0_f32, 3.0, 5.0, 7.0, 9.0, 11.0];
        let expected =
            (union.iter().map(|x| (x - mu).powi(2)).sum::<f32>() / union.len() as f32).sqrt();
        assert!((pooled[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_input_fails_fast() {
        assert!(matches!(combine_means(&[]), Err(FedErr::EmptyInput)));
        assert!(matches!(combine_stds(&[]), Err(FedErr::EmptyInput)));
        assert!(matches!(
            combine_means(&[(0, vec![1.0])]),
            Err(FedErr::EmptyInput)
        ));
    }

    #[test]
    fn mismatched_vector_lengths_are_rejected() {
        let pairs = vec![(1_u64, vec![1.0, 2.0]), (1, vec![3.0])];
        assert!(matches!(
            combine_means(&pairs),
            Err(FedErr::ShapeMismatch { got: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn zero_std_components_become_one() {
        let mut std = [0.5, 0.0, 2.0, 0.0];
        guard_zero_std(&mut std);
        assert_eq!(std, [0.5, 1.0, 2.0, 1.0]);
    }
}
