use std::fmt;

/// Caller-supplied participant identity.
///
/// Identities are never assigned or auto-incremented by a backend, so they
/// stay unambiguous across runs within one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which global statistic a commit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Mean,
    Std,
}

impl StatKind {
    /// The event kind a local report of this statistic emits.
    pub fn event_kind(self) -> EventKind {
        match self {
            Self::Mean => EventKind::LocalMeans,
            Self::Std => EventKind::LocalStds,
        }
    }
}

/// The kind of a committed local contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LocalUpdate,
    LocalMeans,
    LocalStds,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::LocalUpdate => "local update",
            EventKind::LocalMeans => "local means",
            EventKind::LocalStds => "local stds",
        };
        f.write_str(s)
    }
}

/// Opaque handle returned by a commit operation.
///
/// A receipt is proof of durable, ordered inclusion; it resolves to exactly
/// one event of the kind that produced it. It carries no readable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub(crate) seq: u64,
}

/// A typed local contribution recovered from a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sender: Identity,
    /// The round the sender computed its contribution for. Only meaningful
    /// for local updates; statistic reports record the round at commit time.
    pub round: u64,
    /// Number of private samples behind this contribution.
    pub count: u64,
    pub payload: Vec<u8>,
}
