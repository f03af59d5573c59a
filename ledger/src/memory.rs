use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    contract::FlContract,
    error::{LedgerErr, Result},
    event::{Event, EventKind, Identity, Receipt, StatKind},
    interface::Ledger,
};

/// Flat in-memory backend: a plain transaction log with no chaining.
///
/// The fastest stand-in for tests and local experiments. Semantics are
/// identical to [`crate::BlockLedger`]; only durability bookkeeping differs.
pub struct MemoryLedger {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
}

struct Inner {
    contract: FlContract,
    txs: Vec<Tx>,
}

struct Tx {
    /// `None` for global writes, which emit no resolvable event.
    entry: Option<(EventKind, Event)>,
}

impl Inner {
    fn record(&mut self, entry: Option<(EventKind, Event)>) -> Receipt {
        let seq = self.txs.len() as u64;
        self.txs.push(Tx { entry });
        Receipt { seq }
    }
}

impl MemoryLedger {
    /// Deploys the contract. The deployer identity becomes the round owner.
    pub fn deploy(owner: Identity, initial_model: Vec<u8>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    contract: FlContract::deploy(owner, initial_model),
                    txs: Vec::new(),
                }),
            }),
        }
    }

    /// Hands out an account handle bound to `identity`, sharing this
    /// ledger's state.
    pub fn account(&self, identity: Identity) -> MemoryAccount {
        MemoryAccount {
            identity,
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A per-participant handle into a [`MemoryLedger`].
#[derive(Clone)]
pub struct MemoryAccount {
    identity: Identity,
    shared: Arc<Shared>,
}

impl Ledger for MemoryAccount {
    async fn local_update(&self, round: u64, data_size: u64, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        let event = inner
            .contract
            .local_update(&self.identity, round, data_size, payload);
        Ok(inner.record(Some((EventKind::LocalUpdate, event))))
    }

    async fn local_stat(&self, kind: StatKind, count: u64, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        let event = inner.contract.local_stat(&self.identity, count, payload);
        Ok(inner.record(Some((kind.event_kind(), event))))
    }

    async fn global_update(&self, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        inner.contract.global_update(&self.identity, payload)?;
        Ok(inner.record(None))
    }

    async fn global_stat(&self, kind: StatKind, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        inner.contract.global_stat(&self.identity, kind, payload)?;
        Ok(inner.record(None))
    }

    async fn resolve_events(&self, kind: EventKind, receipts: &[Receipt]) -> Result<Vec<Event>> {
        let inner = self.shared.inner.lock();
        receipts
            .iter()
            .map(|receipt| {
                let tx = inner
                    .txs
                    .get(receipt.seq as usize)
                    .ok_or(LedgerErr::ReceiptNotMined { seq: receipt.seq })?;
                match &tx.entry {
                    Some((tx_kind, event)) if *tx_kind == kind => Ok(event.clone()),
                    _ => Err(LedgerErr::MalformedReceipt {
                        seq: receipt.seq,
                        kind,
                        got: 0,
                    }),
                }
            })
            .collect()
    }

    async fn current_round(&self) -> Result<u64> {
        Ok(self.shared.inner.lock().contract.round())
    }

    async fn current_data_size(&self) -> Result<u64> {
        Ok(self.shared.inner.lock().contract.data_size())
    }

    async fn current_model(&self) -> Result<Vec<u8>> {
        Ok(self.shared.inner.lock().contract.model().to_vec())
    }

    async fn current_mean(&self) -> Result<Vec<u8>> {
        Ok(self.shared.inner.lock().contract.mean().to_vec())
    }

    async fn current_std(&self) -> Result<Vec<u8>> {
        Ok(self.shared.inner.lock().contract.std().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receipts_resolve_to_their_own_events() {
        let ledger = MemoryLedger::deploy(Identity::new("server"), b"genesis".to_vec());
        let a = ledger.account(Identity::new("client-a"));
        let b = ledger.account(Identity::new("client-b"));

        let ra = a.local_update(0, 10, vec![1, 2]).await.unwrap();
        let rb = b.local_update(0, 30, vec![3, 4]).await.unwrap();

        let events = a
            .resolve_events(EventKind::LocalUpdate, &[ra, rb])
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sender, Identity::new("client-a"));
        assert_eq!(events[0].count, 10);
        assert_eq!(events[1].payload, vec![3, 4]);
        assert_eq!(a.current_data_size().await.unwrap(), 40);
    }

    #[tokio::test]
    async fn wrong_kind_resolution_is_malformed() {
        let ledger = MemoryLedger::deploy(Identity::new("server"), Vec::new());
        let a = ledger.account(Identity::new("client-a"));

        let receipt = a.local_stat(StatKind::Mean, 5, vec![0]).await.unwrap();
        let err = a
            .resolve_events(EventKind::LocalStds, &[receipt])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerErr::MalformedReceipt { got: 0, .. }));
    }

    #[tokio::test]
    async fn unknown_receipt_is_not_mined() {
        let ledger = MemoryLedger::deploy(Identity::new("server"), Vec::new());
        let a = ledger.account(Identity::new("client-a"));

        let err = a
            .resolve_events(EventKind::LocalUpdate, &[Receipt { seq: 42 }])
            .await
            .unwrap_err();
        assert_eq!(err, LedgerErr::ReceiptNotMined { seq: 42 });
    }

    #[tokio::test]
    async fn global_update_is_owner_only_and_advances_round() {
        let ledger = MemoryLedger::deploy(Identity::new("server"), b"m0".to_vec());
        let server = ledger.account(Identity::new("server"));
        let client = ledger.account(Identity::new("client-a"));

        assert!(matches!(
            client.global_update(b"evil".to_vec()).await,
            Err(LedgerErr::Unauthorized { .. })
        ));
        assert_eq!(server.current_model().await.unwrap(), b"m0");

        server.global_update(b"m1".to_vec()).await.unwrap();
        assert_eq!(server.current_round().await.unwrap(), 1);
        assert_eq!(server.current_model().await.unwrap(), b"m1");
    }
}
