use std::{error::Error, fmt};

use crate::event::{EventKind, Identity};

/// The ledger module's result type.
pub type Result<T> = std::result::Result<T, LedgerErr>;

/// Ledger backend failures.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerErr {
    /// A global write was attempted by an account that is not the round
    /// owner. Recoverable at the caller; the write has no effect.
    Unauthorized {
        sender: Identity,
    },
    /// The receipt matches no durably recorded transaction.
    ReceiptNotMined {
        seq: u64,
    },
    /// The receipt's transaction does not hold exactly one event of the
    /// requested kind. A conformant backend never produces this; it
    /// indicates a protocol bug and aborts the resolution batch.
    MalformedReceipt {
        seq: u64,
        kind: EventKind,
        got: usize,
    },
}

impl fmt::Display for LedgerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerErr::Unauthorized { sender } => {
                write!(f, "account {sender} is not the round owner")
            }
            LedgerErr::ReceiptNotMined { seq } => {
                write!(f, "receipt {seq} does not resolve to a mined transaction")
            }
            LedgerErr::MalformedReceipt { seq, kind, got } => write!(
                f,
                "receipt {seq} resolves to {got} events of kind {kind}, expected exactly one"
            ),
        }
    }
}

impl Error for LedgerErr {}
