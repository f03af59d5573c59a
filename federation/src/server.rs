use std::collections::HashSet;

use codec::Parameters;
use ledger::{Event, EventKind, Ledger, Receipt, StatKind};
use log::{info, warn};

use crate::{
    config::FedConfig,
    error::{FedErr, Result},
    stats,
};

/// The round owner.
///
/// The server is the only participant allowed to commit global state. It
/// resolves client receipts into events, drops duplicates and stale or
/// malformed contributions with a warning, combines the survivors with
/// dataset-size weighting and commits the result, which atomically advances
/// the round.
pub struct Server<L: Ledger> {
    ledger: L,
    params: Parameters,
    cfg: FedConfig,
}

impl<L: Ledger> Server<L> {
    /// Creates a server.
    ///
    /// # Arguments
    /// * `ledger` - The owner's account handle; the backend must have been
    ///   deployed through the same identity.
    /// * `params` - Accumulator buffer matching the deployed model schema.
    pub fn new(ledger: L, params: Parameters, cfg: FedConfig) -> Self {
        Self {
            ledger,
            params,
            cfg,
        }
    }

    /// Combines reported local means into the global mean and commits it.
    pub async fn combine_means(&self, receipts: &[Receipt]) -> Result<Receipt> {
        let pairs = self.resolve_stat_pairs(StatKind::Mean, receipts).await?;
        let mean = stats::combine_means(&pairs)?;
        let payload = codec::encode_vector(&mean, self.cfg.dtype);
        let receipt = self.ledger.global_stat(StatKind::Mean, payload).await?;
        Ok(receipt)
    }

    /// Combines reported local variances into the pooled global standard
    /// deviation and commits it.
    ///
    /// The reports must be variances around the already-committed global
    /// mean; the driver enforces that ordering.
    pub async fn combine_stds(&self, receipts: &[Receipt]) -> Result<Receipt> {
        let pairs = self.resolve_stat_pairs(StatKind::Std, receipts).await?;
        let std = stats::combine_stds(&pairs)?;
        let payload = codec::encode_vector(&std, self.cfg.dtype);
        let receipt = self.ledger.global_stat(StatKind::Std, payload).await?;
        Ok(receipt)
    }

    /// Bypasses preprocessing: commits a zero mean and a unit standard
    /// deviation, so standardization becomes the identity.
    pub async fn skip_preprocess(&self) -> Result<()> {
        let zeros = vec![0.0_f32; self.cfg.num_features];
        let ones = vec![1.0_f32; self.cfg.num_features];
        self.ledger
            .global_stat(StatKind::Mean, codec::encode_vector(&zeros, self.cfg.dtype))
            .await?;
        self.ledger
            .global_stat(StatKind::Std, codec::encode_vector(&ones, self.cfg.dtype))
            .await?;
        Ok(())
    }

    /// Averages the local updates behind `receipts` into the new global
    /// model and commits it, advancing the round.
    ///
    /// Each surviving contribution is weighted by its share of the accepted
    /// data size, so the weights sum to exactly one. Duplicates, updates
    /// recorded for a different round than the current one, and payloads of
    /// the wrong length are dropped with a warning.
    ///
    /// # Returns
    /// `EmptyInput` if no contribution survives filtering.
    pub async fn average_updates(&mut self, receipts: &[Receipt]) -> Result<Receipt> {
        let round = self.ledger.current_round().await?;
        let ledger_total = self.ledger.current_data_size().await?;
        let events = self
            .ledger
            .resolve_events(EventKind::LocalUpdate, receipts)
            .await?;
        info!(round = round; "averaging model from {} local update(s)", events.len());

        let expected_len = self.params.byte_len(self.cfg.dtype);
        let mut seen = HashSet::new();
        let mut accepted: Vec<Event> = Vec::with_capacity(events.len());
        for event in events {
            if !seen.insert(event.sender.clone()) {
                warn!(sender = event.sender.as_str(); "ignoring repeated update");
                continue;
            }
            if event.round != round {
                warn!(sender = event.sender.as_str(), round = event.round;
                    "ignoring update recorded for round {} during round {round}", event.round);
                continue;
            }
            if event.payload.len() != expected_len {
                warn!(sender = event.sender.as_str();
                    "ignoring malformed payload of {} bytes, expected {expected_len}",
                    event.payload.len());
                continue;
            }
            accepted.push(event);
        }

        let total: u64 = accepted.iter().map(|e| e.count).sum();
        if total == 0 {
            return Err(FedErr::EmptyInput);
        }
        if total != ledger_total {
            warn!(accepted = total, recorded = ledger_total;
                "accepted data size diverges from the ledger accumulator");
        }

        self.params.zero();
        for event in &accepted {
            let weight = event.count as f32 / total as f32;
            self.params
                .accumulate_weighted(&event.payload, self.cfg.dtype, weight)?;
        }

        let receipt = self
            .ledger
            .global_update(self.params.encode(self.cfg.dtype))
            .await?;
        info!(round = round; "round committed with {} contribution(s)", accepted.len());
        Ok(receipt)
    }

    /// Pulls the current global model into the server's parameter buffer.
    pub async fn fetch_model(&mut self) -> Result<&Parameters> {
        let bytes = self.ledger.current_model().await?;
        self.params.decode_from(&bytes, self.cfg.dtype)?;
        Ok(&self.params)
    }

    /// Resolves statistic receipts into `(count, vector)` pairs, dropping
    /// repeated senders and undecodable payloads with a warning. Statistic
    /// reports carry no round fence: preprocessing happens once, before any
    /// training round.
    async fn resolve_stat_pairs(
        &self,
        kind: StatKind,
        receipts: &[Receipt],
    ) -> Result<Vec<(u64, Vec<f32>)>> {
        let events = self.ledger.resolve_events(kind.event_kind(), receipts).await?;

        let mut seen = HashSet::new();
        let mut pairs = Vec::with_capacity(events.len());
        for event in events {
            if !seen.insert(event.sender.clone()) {
                warn!(sender = event.sender.as_str(); "ignoring repeated {} report", kind.event_kind());
                continue;
            }
            match codec::decode_vector(&event.payload, self.cfg.dtype, self.cfg.num_features) {
                Ok(vector) => pairs.push((event.count, vector)),
                Err(e) => {
                    warn!(sender = event.sender.as_str(); "ignoring malformed statistic payload: {e}");
                }
            }
        }
        Ok(pairs)
    }
}
