use crate::error::{FedErr, Result};

/// One client's private shard: fixed-width feature rows plus integer labels.
///
/// How the rows were loaded or preprocessed is out of scope; the federation
/// core only consumes batches, column means and column variances.
#[derive(Debug, Clone)]
pub struct Partition {
    features: Vec<f32>,
    labels: Vec<i64>,
    num_features: usize,
}

impl Partition {
    /// Creates a partition from row-major feature data and per-row labels.
    ///
    /// # Returns
    /// `EmptyInput` for zero rows, `ShapeMismatch` if `features` does not
    /// hold exactly `labels.len() * num_features` values.
    pub fn new(features: Vec<f32>, labels: Vec<i64>, num_features: usize) -> Result<Self> {
        if labels.is_empty() {
            return Err(FedErr::EmptyInput);
        }
        let expected = labels.len() * num_features;
        if features.len() != expected {
            return Err(FedErr::ShapeMismatch {
                what: "partition features",
                got: features.len(),
                expected,
            });
        }
        Ok(Self {
            features,
            labels,
            num_features,
        })
    }

    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Column mean over all rows, shape `(1, num_features)`.
    pub fn feature_mean(&self) -> Vec<f32> {
        let mut mean = vec![0.0_f64; self.num_features];
        for row in self.features.chunks_exact(self.num_features) {
            for (dst, &value) in mean.iter_mut().zip(row) {
                *dst += value as f64;
            }
        }
        let rows = self.rows() as f64;
        mean.into_iter().map(|v| (v / rows) as f32).collect()
    }

    /// Column variance around an externally supplied center:
    /// `mean((x - center)^2)` per feature.
    ///
    /// During preprocessing the center is the already-broadcast global mean,
    /// which is what makes the later pooled combination exact.
    pub fn variance_around(&self, center: &[f32]) -> Vec<f32> {
        let mut var = vec![0.0_f64; self.num_features];
        for row in self.features.chunks_exact(self.num_features) {
            for ((dst, &value), &mu) in var.iter_mut().zip(row).zip(center) {
                let d = (value - mu) as f64;
                *dst += d * d;
            }
        }
        let rows = self.rows() as f64;
        var.into_iter().map(|v| (v / rows) as f32).collect()
    }

    /// Splits the partition into batches of at most `batch_size` rows, in
    /// row order. The final batch may be short.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = Batch> + '_ {
        let size = batch_size.max(1);
        self.features
            .chunks(size * self.num_features)
            .zip(self.labels.chunks(size))
            .map(|(features, labels)| Batch {
                features: features.to_vec(),
                labels: labels.to_vec(),
                num_features: self.num_features,
            })
    }
}

/// One batch of rows, owned so it can be standardized without touching the
/// partition.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: Vec<f32>,
    pub labels: Vec<i64>,
    pub num_features: usize,
}

impl Batch {
    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    /// Normalizes every row in place: `(x - mean) / std`, columnwise.
    /// `std` must already have zero components guarded to one.
    pub fn standardize(&mut self, mean: &[f32], std: &[f32]) {
        for row in self.features.chunks_exact_mut(self.num_features) {
            for ((value, &mu), &sigma) in row.iter_mut().zip(mean).zip(std) {
                *value = (*value - mu) / sigma;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_feature_partition() -> Partition {
        // Rows: (1, 10), (3, 20), (5, 30)
        Partition::new(vec![1.0, 10.0, 3.0, 20.0, 5.0, 30.0], vec![0, 1, 0], 2).unwrap()
    }

    #[test]
    fn column_mean_and_variance() {
        let part = two_feature_partition();
        assert_eq!(part.feature_mean(), vec![3.0, 20.0]);

        let var = part.variance_around(&[3.0, 20.0]);
        // ((1-3)^2 + 0 + (5-3)^2) / 3 and ((10-20)^2 + 0 + (30-20)^2) / 3
        assert!((var[0] - 8.0 / 3.0).abs() < 1e-6);
        assert!((var[1] - 200.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn batches_cover_all_rows_in_order() {
        let part = two_feature_partition();
        let batches: Vec<_> = part.batches(2).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].rows(), 2);
        assert_eq!(batches[1].rows(), 1);
        assert_eq!(batches[1].features, vec![5.0, 30.0]);
        assert_eq!(batches[1].labels, vec![0]);
    }

    #[test]
    fn standardize_applies_columnwise() {
        let part = two_feature_partition();
        let mut batch = part.batches(3).next().unwrap();
        batch.standardize(&[3.0, 20.0], &[2.0, 10.0]);
        assert_eq!(batch.features, vec![-1.0, -1.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn bad_shapes_are_rejected() {
        assert!(matches!(
            Partition::new(vec![1.0; 5], vec![0, 1], 2),
            Err(FedErr::ShapeMismatch { got: 5, expected: 4, .. })
        ));
        assert!(matches!(
            Partition::new(Vec::new(), Vec::new(), 2),
            Err(FedErr::EmptyInput)
        ));
    }
}
