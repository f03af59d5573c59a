//! Federated training roles over a shared ledger.
//!
//! A [`Server`] owns round advancement: it collects client receipts,
//! deduplicates and validates the events behind them, combines the reported
//! values with dataset-size weighting and commits the new global state. Each
//! [`Client`] reports statistics over its private partition, trains the
//! current global model locally and commits the result fenced to the round
//! it was computed for. The [`RoundDriver`] sequences the one-time
//! preprocessing stage and the training rounds, selecting a participant
//! subset for each.
//!
//! The preprocessing protocol is two-phase on purpose: local means are
//! combined into a global mean first, and only then does every client report
//! its variance *around that global mean*. That ordering is what makes the
//! pooled standard deviation exact rather than an approximation.

mod client;
mod config;
mod data;
mod driver;
mod error;
mod registry;
mod server;
pub mod stats;
mod training;

pub use client::Client;
pub use config::FedConfig;
pub use data::{Batch, Partition};
pub use driver::RoundDriver;
pub use error::{FedErr, Result};
pub use registry::{ModelBuild, ModelRegistry};
pub use server::Server;
pub use training::Trainer;
