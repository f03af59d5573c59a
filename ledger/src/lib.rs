//! The coordination substrate of federated training.
//!
//! Round state (model, round counter, data-size accumulator, global
//! statistics) lives in an append-only, tamper-evident ledger. Participants
//! drive it exclusively through the [`Ledger`] trait: commits return an
//! opaque [`Receipt`] that later resolves to exactly one typed [`Event`].
//!
//! Two interchangeable backends implement the trait: [`MemoryLedger`], a
//! flat in-memory stand-in, and [`BlockLedger`], a hash-chained block log
//! that models the ordering and tamper-evidence guarantees of a
//! contract-backed chain.

mod chain;
mod contract;
mod error;
mod event;
mod interface;
mod memory;

pub use chain::{BlockAccount, BlockLedger};
pub use error::{LedgerErr, Result};
pub use event::{Event, EventKind, Identity, Receipt, StatKind};
pub use interface::Ledger;
pub use memory::{MemoryAccount, MemoryLedger};
