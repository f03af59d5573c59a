use crate::{
    error::{LedgerErr, Result},
    event::{Event, Identity, StatKind},
};

/// The federated-learning contract rules shared by every backend: who may
/// write what, and how a global update advances the round.
///
/// Backends differ in how they record transactions and hand out receipts;
/// the state transitions themselves are identical.
#[derive(Debug)]
pub(crate) struct FlContract {
    owner: Identity,
    round: u64,
    data_size: u64,
    model: Vec<u8>,
    mean: Vec<u8>,
    std: Vec<u8>,
}

impl FlContract {
    /// Initializes contract state with round 0 and an empty data-size
    /// accumulator. The deployer becomes the round owner.
    pub fn deploy(owner: Identity, initial_model: Vec<u8>) -> Self {
        Self {
            owner,
            round: 0,
            data_size: 0,
            model: initial_model,
            mean: Vec::new(),
            std: Vec::new(),
        }
    }

    fn authorize(&self, sender: &Identity) -> Result<()> {
        if *sender != self.owner {
            return Err(LedgerErr::Unauthorized {
                sender: sender.clone(),
            });
        }
        Ok(())
    }

    /// Records a local update and returns the event it emits.
    pub fn local_update(
        &mut self,
        sender: &Identity,
        round: u64,
        data_size: u64,
        payload: Vec<u8>,
    ) -> Event {
        self.data_size += data_size;
        Event {
            sender: sender.clone(),
            round,
            count: data_size,
            payload,
        }
    }

    /// Records a local statistic report and returns the event it emits.
    pub fn local_stat(&mut self, sender: &Identity, count: u64, payload: Vec<u8>) -> Event {
        Event {
            sender: sender.clone(),
            round: self.round,
            count,
            payload,
        }
    }

    /// Owner-only: overwrites the model, advances the round, resets the
    /// data-size accumulator.
    pub fn global_update(&mut self, sender: &Identity, payload: Vec<u8>) -> Result<()> {
        self.authorize(sender)?;
        self.model = payload;
        self.round += 1;
        self.data_size = 0;
        Ok(())
    }

    /// Owner-only: overwrites a global statistic vector.
    pub fn global_stat(&mut self, sender: &Identity, kind: StatKind, payload: Vec<u8>) -> Result<()> {
        self.authorize(sender)?;
        match kind {
            StatKind::Mean => self.mean = payload,
            StatKind::Std => self.std = payload,
        }
        Ok(())
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn model(&self) -> &[u8] {
        &self.model
    }

    pub fn mean(&self) -> &[u8] {
        &self.mean
    }

    pub fn std(&self) -> &[u8] {
        &self.std
    }
}
