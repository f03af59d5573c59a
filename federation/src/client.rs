use codec::Parameters;
use ledger::{Identity, Ledger, Receipt, StatKind};
use log::info;

use crate::{
    config::FedConfig,
    data::Partition,
    error::{FedErr, Result},
    stats,
    training::Trainer,
};

/// One federated participant.
///
/// Each round it participates in, a client cycles through the same motions:
/// report local statistics (preprocessing only), pull the current global
/// model, train it over its private partition with standardized inputs, and
/// commit the result fenced to the round it was computed for. Staleness is
/// the server's problem to detect, not the client's.
pub struct Client<L: Ledger> {
    identity: Identity,
    ledger: L,
    partition: Partition,
    trainer: Box<dyn Trainer>,
    params: Parameters,
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
    cfg: FedConfig,
}

impl<L: Ledger> Client<L> {
    /// Creates a client.
    ///
    /// # Arguments
    /// * `identity` - Caller-supplied participant identity.
    /// * `ledger` - This participant's account handle into the shared ledger.
    /// * `partition` - The private data shard.
    /// * `trainer` - The model/optimizer collaborator.
    /// * `params` - Local parameter buffer; its schema must match the
    ///   deployed global model.
    pub fn new(
        identity: Identity,
        ledger: L,
        partition: Partition,
        trainer: Box<dyn Trainer>,
        params: Parameters,
        cfg: FedConfig,
    ) -> Self {
        Self {
            identity,
            ledger,
            partition,
            trainer,
            params,
            mean: None,
            std: None,
            cfg,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Reports the column mean of the private partition.
    ///
    /// # Returns
    /// The commit receipt, for the server to resolve later.
    pub async fn report_local_mean(&self) -> Result<Receipt> {
        let mean = self.partition.feature_mean();
        let payload = codec::encode_vector(&mean, self.cfg.dtype);
        let receipt = self
            .ledger
            .local_stat(StatKind::Mean, self.partition.rows() as u64, payload)
            .await?;
        Ok(receipt)
    }

    /// Reports the column variance around the cached global mean.
    ///
    /// Must run after [`Client::refresh_global_mean`]; centering every
    /// shard's variance on the same global mean is what keeps the server's
    /// pooled combination exact.
    pub async fn report_local_std(&self) -> Result<Receipt> {
        let mean = self.mean.as_ref().ok_or(FedErr::GlobalStatsMissing)?;
        let variance = self.partition.variance_around(mean);
        let payload = codec::encode_vector(&variance, self.cfg.dtype);
        let receipt = self
            .ledger
            .local_stat(StatKind::Std, self.partition.rows() as u64, payload)
            .await?;
        Ok(receipt)
    }

    /// Pulls and caches the current global mean.
    pub async fn refresh_global_mean(&mut self) -> Result<()> {
        let bytes = self.ledger.current_mean().await?;
        let mean = codec::decode_vector(&bytes, self.cfg.dtype, self.cfg.num_features)?;
        self.mean = Some(mean);
        Ok(())
    }

    /// Pulls and caches the current global standard deviation, remapping
    /// zero components to one before it is ever used as a divisor.
    pub async fn refresh_global_std(&mut self) -> Result<()> {
        let bytes = self.ledger.current_std().await?;
        let mut std = codec::decode_vector(&bytes, self.cfg.dtype, self.cfg.num_features)?;
        stats::guard_zero_std(&mut std);
        self.std = Some(std);
        Ok(())
    }

    /// Runs one bounded local training pass and commits the result.
    ///
    /// Reads the current round and global model, decodes it into the local
    /// parameter buffer, trains `local_epochs` passes over standardized
    /// batches and commits `(round, rows, encoded parameters)`.
    ///
    /// # Returns
    /// The commit receipt, for the server to resolve later.
    pub async fn perform_local_update(&mut self) -> Result<Receipt> {
        if self.mean.is_none() || self.std.is_none() {
            return Err(FedErr::GlobalStatsMissing);
        }

        let round = self.ledger.current_round().await?;
        let model_bytes = self.ledger.current_model().await?;
        self.params.decode_from(&model_bytes, self.cfg.dtype)?;

        let mean = self.mean.as_ref().ok_or(FedErr::GlobalStatsMissing)?;
        let std = self.std.as_ref().ok_or(FedErr::GlobalStatsMissing)?;

        let mut total_loss = 0.0;
        let mut steps = 0usize;
        for _ in 0..self.cfg.local_epochs {
            for mut batch in self.partition.batches(self.cfg.batch_size) {
                batch.standardize(mean, std);
                total_loss += self.trainer.step(&mut self.params, &batch);
                steps += 1;
            }
        }
        let loss = total_loss / steps.max(1) as f32;
        info!(client = self.identity.as_str(), round = round; "local loss: {loss}");

        let payload = self.params.encode(self.cfg.dtype);
        let receipt = self
            .ledger
            .local_update(round, self.partition.rows() as u64, payload)
            .await?;
        Ok(receipt)
    }
}
