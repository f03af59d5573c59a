use crate::{
    error::Result,
    event::{Event, EventKind, Receipt, StatKind},
};

/// The ledger client interface every participant depends on.
///
/// An implementor is a per-account handle bound to one participant identity
/// and a shared backend. Commit calls block until the contribution is
/// durably recorded in order; a returned [`Receipt`] resolves to exactly one
/// typed event. Global writes succeed only for the round owner (the
/// deployer), everything else is open to any account.
#[trait_variant::make(Ledger: Send)]
pub trait LedgerTemplate {
    /// Commits a local model update computed for `round` over `data_size`
    /// private samples.
    ///
    /// # Returns
    /// The receipt of the emitted `LocalUpdate` event.
    async fn local_update(&self, round: u64, data_size: u64, payload: Vec<u8>) -> Result<Receipt>;

    /// Commits a local statistic report over `count` private samples.
    ///
    /// # Returns
    /// The receipt of the emitted `LocalMeans`/`LocalStds` event.
    async fn local_stat(&self, kind: StatKind, count: u64, payload: Vec<u8>) -> Result<Receipt>;

    /// Overwrites the global model, advances the round by one and resets the
    /// data-size accumulator, atomically.
    ///
    /// # Returns
    /// `Unauthorized` unless called through the owner's account.
    async fn global_update(&self, payload: Vec<u8>) -> Result<Receipt>;

    /// Overwrites a global statistic vector.
    ///
    /// # Returns
    /// `Unauthorized` unless called through the owner's account.
    async fn global_stat(&self, kind: StatKind, payload: Vec<u8>) -> Result<Receipt>;

    /// Resolves opaque receipts into typed events, in receipt order.
    ///
    /// # Returns
    /// `ReceiptNotMined` if a receipt matches no recorded transaction, or
    /// `MalformedReceipt` if a transaction holds anything other than exactly
    /// one event of the requested kind.
    async fn resolve_events(&self, kind: EventKind, receipts: &[Receipt]) -> Result<Vec<Event>>;

    /// The current round counter. Advances by exactly one per global update.
    async fn current_round(&self) -> Result<u64>;

    /// Sum of data sizes committed through local updates since the last
    /// global update.
    async fn current_data_size(&self) -> Result<u64>;

    /// The current global model bytes.
    async fn current_model(&self) -> Result<Vec<u8>>;

    /// The current global mean bytes.
    async fn current_mean(&self) -> Result<Vec<u8>>;

    /// The current global standard-deviation bytes.
    async fn current_std(&self) -> Result<Vec<u8>>;
}
