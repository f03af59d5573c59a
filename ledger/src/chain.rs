use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::{
    contract::FlContract,
    error::{LedgerErr, Result},
    event::{Event, EventKind, Identity, Receipt, StatKind},
    interface::Ledger,
};

/// Append-only hash-chained block log.
///
/// Models the guarantees this system consumes from a contract-backed chain:
/// every commit seals exactly one block linked to its parent's SHA-256
/// digest, so commits are totally ordered and recorded contributions cannot
/// be altered without breaking the chain. Receipts resolve through sealed
/// blocks only.
pub struct BlockLedger {
    shared: Arc<Shared>,
}

type BlockHash = [u8; 32];

/// Genesis parent: all zeroes means no parent.
const ZERO_HASH: BlockHash = [0u8; 32];

struct Shared {
    inner: Mutex<Inner>,
}

struct Inner {
    contract: FlContract,
    blocks: Vec<Block>,
}

#[derive(Debug)]
struct Block {
    height: u64,
    parent_hash: BlockHash,
    hash: BlockHash,
    /// `None` for global writes, which emit no resolvable event.
    entry: Option<(EventKind, Event)>,
}

impl Block {
    fn seal(height: u64, parent_hash: BlockHash, entry: Option<(EventKind, Event)>) -> Self {
        let hash = Self::digest(height, &parent_hash, &entry);
        Self {
            height,
            parent_hash,
            hash,
            entry,
        }
    }

    /// SHA-256 over the block's hash material. Variable-length fields are
    /// length-prefixed so no two distinct blocks share the same material.
    fn digest(height: u64, parent_hash: &BlockHash, entry: &Option<(EventKind, Event)>) -> BlockHash {
        let mut hasher = Sha256::new();
        hasher.update(height.to_le_bytes());
        hasher.update(parent_hash);
        match entry {
            None => hasher.update([0u8]),
            Some((kind, event)) => {
                hasher.update([kind_tag(*kind)]);
                let sender = event.sender.as_str().as_bytes();
                hasher.update((sender.len() as u64).to_le_bytes());
                hasher.update(sender);
                hasher.update(event.round.to_le_bytes());
                hasher.update(event.count.to_le_bytes());
                hasher.update(&event.payload);
            }
        }
        hasher.finalize().into()
    }
}

/// Nonzero so an entry-carrying block never shares material with a global
/// write, whose tag is 0.
fn kind_tag(kind: EventKind) -> u8 {
    match kind {
        EventKind::LocalUpdate => 1,
        EventKind::LocalMeans => 2,
        EventKind::LocalStds => 3,
    }
}

impl Inner {
    fn seal(&mut self, entry: Option<(EventKind, Event)>) -> Receipt {
        let height = self.blocks.len() as u64;
        // Height 0 is the genesis block sealed at deployment.
        let parent_hash = self.blocks.last().map(|b| b.hash).unwrap_or(ZERO_HASH);
        let block = Block::seal(height, parent_hash, entry);
        debug!(height = height; "sealed block");
        self.blocks.push(block);
        Receipt { seq: height }
    }
}

impl BlockLedger {
    /// Deploys the contract and seals the genesis block. The deployer
    /// identity becomes the round owner.
    pub fn deploy(owner: Identity, initial_model: Vec<u8>) -> Self {
        let contract = FlContract::deploy(owner, initial_model);
        let mut inner = Inner {
            contract,
            blocks: Vec::new(),
        };
        inner.seal(None);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
            }),
        }
    }

    /// Hands out an account handle bound to `identity`, sharing this chain.
    pub fn account(&self, identity: Identity) -> BlockAccount {
        BlockAccount {
            identity,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Re-walks the whole chain, recomputing every block digest and parent
    /// link.
    ///
    /// # Returns
    /// `true` exactly when no recorded block has been altered.
    pub fn verify(&self) -> bool {
        let inner = self.shared.inner.lock();
        let mut parent_hash = ZERO_HASH;
        for (height, block) in inner.blocks.iter().enumerate() {
            let expected = Block::digest(height as u64, &parent_hash, &block.entry);
            if block.height != height as u64
                || block.parent_hash != parent_hash
                || block.hash != expected
            {
                return false;
            }
            parent_hash = block.hash;
        }
        true
    }
}

/// A per-participant handle into a [`BlockLedger`].
#[derive(Clone)]
pub struct BlockAccount {
    identity: Identity,
    shared: Arc<Shared>,
}

impl Ledger for BlockAccount {
    async fn local_update(&self, round: u64, data_size: u64, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        let event = inner
            .contract
            .local_update(&self.identity, round, data_size, payload);
        Ok(inner.seal(Some((EventKind::LocalUpdate, event))))
    }

    async fn local_stat(&self, kind: StatKind, count: u64, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        let event = inner.contract.local_stat(&self.identity, count, payload);
        Ok(inner.seal(Some((kind.event_kind(), event))))
    }

    async fn global_update(&self, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        inner.contract.global_update(&self.identity, payload)?;
        Ok(inner.seal(None))
    }

    async fn global_stat(&self, kind: StatKind, payload: Vec<u8>) -> Result<Receipt> {
        let mut inner = self.shared.inner.lock();
        inner.contract.global_stat(&self.identity, kind, payload)?;
        Ok(inner.seal(None))
    }

    async fn resolve_events(&self, kind: EventKind, receipts: &[Receipt]) -> Result<Vec<Event>> {
        let inner = self.shared.inner.lock();
        receipts
            .iter()
            .map(|receipt| {
                let block = inner
                    .blocks
                    .get(receipt.seq as usize)
                    .ok_or(LedgerErr::ReceiptNotMined { seq: receipt.seq })?;
                match &block.entry {
                    Some((block_kind, event)) if *block_kind == kind => Ok(event.clone()),
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
    async fn commits_chain_and_verify() {
        let chain = BlockLedger::deploy(Identity::new("server"), b"genesis".to_vec());
        let server = chain.account(Identity::new("server"));
        let client = chain.account(Identity::new("client-a"));

        let receipt = client.local_update(0, 10, vec![1, 2, 3]).await.unwrap();
        server.global_update(b"m1".to_vec()).await.unwrap();

        assert!(chain.verify());

        let events = client
            .resolve_events(EventKind::LocalUpdate, &[receipt])
            .await
            .unwrap();
        assert_eq!(events[0].payload, vec![1, 2, 3]);
        assert_eq!(server.current_round().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tampered_payload_breaks_verification() {
        let chain = BlockLedger::deploy(Identity::new("server"), Vec::new());
        let client = chain.account(Identity::new("client-a"));
        client.local_update(0, 10, vec![1, 2, 3]).await.unwrap();
        assert!(chain.verify());

        {
            let mut inner = chain.shared.inner.lock();
            let block = inner.blocks.last_mut().unwrap();
            if let Some((_, event)) = &mut block.entry {
                event.payload[0] = 99;
            }
        }
        assert!(!chain.verify());
    }

    #[tokio::test]
    async fn reforged_block_breaks_the_parent_links() {
        let chain = BlockLedger::deploy(Identity::new("server"), Vec::new());
        let client = chain.account(Identity::new("client-a"));
        client.local_update(0, 10, vec![1, 2, 3]).await.unwrap();
        client.local_update(0, 20, vec![4, 5, 6]).await.unwrap();
        assert!(chain.verify());

        // Rewrite an interior entry and re-seal the block so its own digest
        // is consistent again. The successor's parent link must still expose
        // the forgery.
        {
            let mut inner = chain.shared.inner.lock();
            let block = &mut inner.blocks[1];
            if let Some((_, event)) = &mut block.entry {
                event.count = 1_000_000;
            }
            let reforged = Block::digest(block.height, &block.parent_hash, &block.entry);
            block.hash = reforged;
        }
        assert!(!chain.verify());
    }

    #[test]
    fn digest_covers_every_block_field() {
        let entry = Some((
            EventKind::LocalUpdate,
            Event {
                sender: Identity::new("client-a"),
                round: 3,
                count: 10,
                payload: vec![1, 2, 3],
            },
        ));
        let base = Block::digest(1, &ZERO_HASH, &entry);
        assert_ne!(base, Block::digest(2, &ZERO_HASH, &entry));
        assert_ne!(base, Block::digest(1, &[7u8; 32], &entry));
        assert_ne!(base, Block::digest(1, &ZERO_HASH, &None));

        let mut other = entry.clone();
        if let Some((_, event)) = &mut other {
            event.round = 4;
        }
        assert_ne!(base, Block::digest(1, &ZERO_HASH, &other));
    }

    #[tokio::test]
    async fn genesis_receipt_carries_no_event() {
        let chain = BlockLedger::deploy(Identity::new("server"), Vec::new());
        let client = chain.account(Identity::new("client-a"));

        let err = client
            .resolve_events(EventKind::LocalUpdate, &[Receipt { seq: 0 }])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerErr::MalformedReceipt { .. }));
    }
}
