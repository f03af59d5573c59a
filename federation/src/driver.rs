use std::collections::HashSet;

use futures::future::try_join_all;
use ledger::Ledger;
use log::info;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{client::Client, config::FedConfig, error::Result, server::Server};

/// Sequences the one-time preprocessing stage and the training rounds.
///
/// The driver performs no aggregation math itself; it selects the
/// pseudo-random participant subset for each stage, runs the selected
/// clients' commits in parallel, and hands the collected receipts to the
/// server. Aggregation always runs to completion before the next round's
/// subset is launched; that sequencing is the single ordering guarantee
/// the whole protocol depends on.
pub struct RoundDriver {
    rng: StdRng,
    cfg: FedConfig,
}

impl RoundDriver {
    pub fn new(cfg: FedConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
        }
    }

    /// Selects `max(1, round(fraction * len))` distinct client indices.
    fn pick(&mut self, len: usize, fraction: f64) -> HashSet<usize> {
        if len == 0 {
            return HashSet::new();
        }
        let amount = ((fraction * len as f64).round() as usize).clamp(1, len);
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.rng);
        indices.truncate(amount);
        indices.into_iter().collect()
    }

    /// Runs the two-phase preprocessing stage.
    ///
    /// A single subset reports in both passes; each pass's combined result
    /// is broadcast to *every* client before the next pass begins, so all
    /// variances are centered on the same global mean. A preprocessing
    /// fraction of zero takes the skip path (zero mean, unit std) and still
    /// broadcasts.
    pub async fn preprocess<L: Ledger>(
        &mut self,
        clients: &mut [Client<L>],
        server: &Server<L>,
    ) -> Result<()> {
        if self.cfg.preprocessing_fraction == 0.0 {
            info!("preprocessing fraction is zero, committing identity statistics");
            server.skip_preprocess().await?;
            for client in clients.iter_mut() {
                client.refresh_global_mean().await?;
                client.refresh_global_std().await?;
            }
            return Ok(());
        }

        let chosen = self.pick(clients.len(), self.cfg.preprocessing_fraction);
        info!("preprocess stage started, {} client(s) participate", chosen.len());

        let receipts = try_join_all(
            clients
                .iter()
                .enumerate()
                .filter(|(i, _)| chosen.contains(i))
                .map(|(_, client)| client.report_local_mean()),
        )
        .await?;
        server.combine_means(&receipts).await?;
        for client in clients.iter_mut() {
            client.refresh_global_mean().await?;
        }

        let receipts = try_join_all(
            clients
                .iter()
                .enumerate()
                .filter(|(i, _)| chosen.contains(i))
                .map(|(_, client)| client.report_local_std()),
        )
        .await?;
        server.combine_stds(&receipts).await?;
        for client in clients.iter_mut() {
            client.refresh_global_std().await?;
        }
        Ok(())
    }

    /// Runs one training round: select a subset, collect their local update
    /// receipts in parallel, then aggregate.
    pub async fn train_round<L: Ledger>(
        &mut self,
        clients: &mut [Client<L>],
        server: &mut Server<L>,
    ) -> Result<()> {
        let chosen = self.pick(clients.len(), self.cfg.training_fraction);
        info!("training round started, {} client(s) selected", chosen.len());

        let receipts = try_join_all(
            clients
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| chosen.contains(i))
                .map(|(_, client)| client.perform_local_update()),
        )
        .await?;

        // Must finish before the next round's clients read global state.
        server.average_updates(&receipts).await?;
        Ok(())
    }

    /// Preprocesses once, then runs `rounds` training rounds.
    pub async fn run<L: Ledger>(
        &mut self,
        clients: &mut [Client<L>],
        server: &mut Server<L>,
        rounds: usize,
    ) -> Result<()> {
        self.preprocess(clients, server).await?;
        for _ in 0..rounds {
            self.train_round(clients, server).await?;
        }
        Ok(())
    }
}
