use std::{error::Error, fmt};

use codec::CodecErr;
use ledger::LedgerErr;

/// The federation module's result type.
pub type Result<T> = std::result::Result<T, FedErr>;

/// Federation runtime failures.
#[derive(Debug)]
pub enum FedErr {
    /// No contribution survived filtering, or an empty pair list was handed
    /// to a combiner. Combining nothing would divide by zero.
    EmptyInput,
    /// A client operation needed the global mean/std before they were
    /// fetched from the ledger.
    GlobalStatsMissing,
    /// A vector or partition does not match the configured feature width.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// No model is registered under the requested name.
    UnknownModel {
        name: String,
    },
    Codec(CodecErr),
    Ledger(LedgerErr),
}

impl fmt::Display for FedErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FedErr::EmptyInput => write!(f, "no contributions to combine"),
            FedErr::GlobalStatsMissing => {
                write!(f, "global statistics have not been fetched from the ledger")
            }
            FedErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} has length {got}, expected {expected}"),
            FedErr::UnknownModel { name } => write!(f, "no model registered under {name:?}"),
            FedErr::Codec(e) => write!(f, "codec error: {e}"),
            FedErr::Ledger(e) => write!(f, "ledger error: {e}"),
        }
    }
}

impl Error for FedErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FedErr::Codec(e) => Some(e),
            FedErr::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecErr> for FedErr {
    fn from(value: CodecErr) -> Self {
        Self::Codec(value)
    }
}

impl From<LedgerErr> for FedErr {
    fn from(value: LedgerErr) -> Self {
        Self::Ledger(value)
    }
}
