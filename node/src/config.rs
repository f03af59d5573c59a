use serde::Deserialize;

/// Which ledger backend a run coordinates through.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Memory,
    Chain,
}

/// Synthetic dataset shape.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub samples: usize,
    pub num_features: usize,
    pub num_labels: usize,
    /// Fraction of samples held out for validation.
    pub validation_size: f64,
}

/// Model choice and its hyperparameters, consumed by the trainer factory.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub learning_rate: f32,
    pub momentum: f32,
}

/// One federated run, read from a JSON file at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub platform: Platform,
    pub num_users: usize,
    pub local_epochs: usize,
    pub global_epochs: usize,
    pub preprocessing_fraction: f64,
    pub training_fraction: f64,
    /// External wire width in bits: 16, 32 or 64.
    pub external_bits: u32,
    pub batch_size: usize,
    pub seed: u64,
    pub evaluate_per_epoch: bool,
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
}
