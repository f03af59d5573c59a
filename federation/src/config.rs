use codec::FloatDtype;

/// Immutable run configuration, threaded through client, server and driver
/// construction. Never global state.
#[derive(Debug, Clone)]
pub struct FedConfig {
    /// External wire dtype for every model and statistic payload.
    pub dtype: FloatDtype,
    /// Feature dimensionality of the dataset; statistic vectors have this
    /// length.
    pub num_features: usize,
    /// Bounded number of local passes over a client's partition per round.
    pub local_epochs: usize,
    /// Rows per training batch.
    pub batch_size: usize,
    /// Fraction of clients selected for the one-time preprocessing stage.
    /// Zero skips preprocessing entirely (identity statistics).
    pub preprocessing_fraction: f64,
    /// Fraction of clients selected each training round. Minimum one client.
    pub training_fraction: f64,
    /// Seed for subset selection; fixed seed, fixed schedule.
    pub seed: u64,
}
