use federation::{FedErr, Partition, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

use crate::config::DatasetConfig;

/// A synthetic classification dataset split for one federated run.
pub struct DataSplit {
    pub partitions: Vec<Partition>,
    pub holdout: Partition,
}

/// Generates a gaussian-cluster classification dataset and splits it:
/// `validation_size` of the samples become the holdout partition, the rest
/// is divided equally across `num_users` clients.
///
/// Stands in for the out-of-scope dataset loader; everything downstream
/// only sees fixed-width feature rows and integer labels.
pub fn generate(cfg: &DatasetConfig, num_users: usize, seed: u64) -> Result<DataSplit> {
    let mut rng = StdRng::seed_from_u64(seed);

    let centers: Vec<Vec<f32>> = (0..cfg.num_labels)
        .map(|_| {
            (0..cfg.num_features)
                .map(|_| rng.random_range(-4.0_f32..4.0))
                .collect()
        })
        .collect();

    let mut features = Vec::with_capacity(cfg.samples * cfg.num_features);
    let mut labels = Vec::with_capacity(cfg.samples);
    for _ in 0..cfg.samples {
        let label = rng.random_range(0..cfg.num_labels);
        labels.push(label as i64);
        // Unit gaussian noise around the well-separated per-class center.
        let center = &centers[label];
        features.extend(
            center
                .iter()
                .map(|&c| c + rng.sample::<f32, _>(StandardNormal)),
        );
    }

    let holdout_rows = ((cfg.samples as f64 * cfg.validation_size) as usize).max(1);
    let train_rows = cfg.samples.saturating_sub(holdout_rows);
    let rows_per_user = train_rows / num_users.max(1);
    if rows_per_user == 0 {
        // Not enough training rows to give every client at least one.
        return Err(FedErr::EmptyInput);
    }

    let holdout = Partition::new(
        features[..holdout_rows * cfg.num_features].to_vec(),
        labels[..holdout_rows].to_vec(),
        cfg.num_features,
    )?;

    let mut partitions = Vec::with_capacity(num_users);
    for user in 0..num_users {
        let start = holdout_rows + user * rows_per_user;
        let end = start + rows_per_user;
        partitions.push(Partition::new(
            features[start * cfg.num_features..end * cfg.num_features].to_vec(),
            labels[start..end].to_vec(),
            cfg.num_features,
        )?);
    }

    Ok(DataSplit {
        partitions,
        holdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_cfg() -> DatasetConfig {
        DatasetConfig {
            samples: 100,
            num_features: 3,
            num_labels: 2,
            validation_size: 0.2,
        }
    }

    #[test]
    fn split_is_equal_and_reproducible() {
        let split = generate(&dataset_cfg(), 4, 9).unwrap();
        assert_eq!(split.holdout.rows(), 20);
        assert_eq!(split.partitions.len(), 4);
        assert!(split.partitions.iter().all(|p| p.rows() == 20));

        let again = generate(&dataset_cfg(), 4, 9).unwrap();
        assert_eq!(split.holdout.feature_mean(), again.holdout.feature_mean());
    }

    #[test]
    fn too_many_users_for_the_data_is_an_error() {
        assert!(matches!(
            generate(&dataset_cfg(), 100, 9),
            Err(FedErr::EmptyInput)
        ));
    }
}
