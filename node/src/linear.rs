use codec::{Parameters, Tensor};
use federation::{Batch, ModelBuild, ModelRegistry, Partition, Trainer};
use log::debug;

/// Registers the built-in softmax-regression model under `"linear"`.
///
/// Weights start at zero, so every participant deploys and builds an
/// identical initial model without sharing a random seed.
pub fn register(registry: &mut ModelRegistry, learning_rate: f32, momentum: f32) {
    registry.register("linear", move |num_features, num_labels| ModelBuild {
        params: Parameters::new(vec![
            Tensor::zeros(vec![num_labels, num_features]),
            Tensor::zeros(vec![num_labels]),
        ]),
        trainer: Box::new(LinearTrainer {
            num_features,
            num_labels,
            learning_rate,
            momentum,
            vel_w: vec![0.0; num_labels * num_features],
            vel_b: vec![0.0; num_labels],
        }),
    });
}

/// Softmax regression trained with SGD plus classical momentum.
///
/// Parameter schema (and therefore wire order): weight `[labels, features]`
/// then bias `[labels]`.
struct LinearTrainer {
    num_features: usize,
    num_labels: usize,
    learning_rate: f32,
    momentum: f32,
    vel_w: Vec<f32>,
    vel_b: Vec<f32>,
}

impl Trainer for LinearTrainer {
    fn step(&mut self, params: &mut Parameters, batch: &Batch) -> f32 {
        let rows = batch.rows();
        if rows == 0 {
            return 0.0;
        }

        let mut grad_w = vec![0.0_f32; self.num_labels * self.num_features];
        let mut grad_b = vec![0.0_f32; self.num_labels];
        let mut loss = 0.0_f32;

        {
            let (weight, bias) = (params.tensors()[0].data(), params.tensors()[1].data());
            for (row, &label) in batch
                .features
                .chunks_exact(self.num_features)
                .zip(&batch.labels)
            {
                let probs = softmax(&forward(weight, bias, row, self.num_labels));
                let label = label as usize;
                loss -= probs[label].max(f32::MIN_POSITIVE).ln();

                for (k, &p) in probs.iter().enumerate() {
                    let delta = p - if k == label { 1.0 } else { 0.0 };
                    grad_b[k] += delta;
                    let w_row = &mut grad_w[k * self.num_features..(k + 1) * self.num_features];
                    for (g, &x) in w_row.iter_mut().zip(row) {
                        *g += delta * x;
                    }
                }
            }
        }

        let scale = 1.0 / rows as f32;
        let (weight, rest) = params.tensors_mut().split_at_mut(1);
        for ((w, v), g) in weight[0]
            .data_mut()
            .iter_mut()
            .zip(&mut self.vel_w)
            .zip(&grad_w)
        {
            *v = self.momentum * *v + g * scale;
            *w -= self.learning_rate * *v;
        }
        for ((b, v), g) in rest[0]
            .data_mut()
            .iter_mut()
            .zip(&mut self.vel_b)
            .zip(&grad_b)
        {
            *v = self.momentum * *v + g * scale;
            *b -= self.learning_rate * *v;
        }

        debug!(rows = rows; "linear trainer step");
        loss / rows as f32
    }
}

/// Accuracy and mean cross-entropy of a model over a partition, with inputs
/// standardized by the given global statistics.
pub fn evaluate(
    params: &Parameters,
    partition: &Partition,
    mean: &[f32],
    std: &[f32],
) -> (f32, f32) {
    let weight = params.tensors()[0].data();
    let bias = params.tensors()[1].data();
    let num_labels = bias.len();

    let mut correct = 0usize;
    let mut loss = 0.0_f32;
    let mut rows = 0usize;
    for mut batch in partition.batches(256) {
        batch.standardize(mean, std);
        for (row, &label) in batch
            .features
            .chunks_exact(batch.num_features)
            .zip(&batch.labels)
        {
            let probs = softmax(&forward(weight, bias, row, num_labels));
            let label = label as usize;
            loss -= probs[label].max(f32::MIN_POSITIVE).ln();

            let predicted = probs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(k, _)| k)
                .unwrap_or(0);
            if predicted == label {
                correct += 1;
            }
            rows += 1;
        }
    }

    (correct as f32 / rows as f32, loss / rows as f32)
}

fn forward(weight: &[f32], bias: &[f32], row: &[f32], num_labels: usize) -> Vec<f32> {
    let num_features = row.len();
    (0..num_labels)
        .map(|k| {
            let w_row = &weight[k * num_features..(k + 1) * num_features];
            bias[k] + w_row.iter().zip(row).map(|(w, x)| w * x).sum::<f32>()
        })
        .collect()
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
