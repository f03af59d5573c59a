use std::sync::{Arc, Mutex};

use codec::{FloatDtype, Parameters, Tensor};
use federation::{Batch, Client, FedConfig, FedErr, Partition, RoundDriver, Server, Trainer};
use ledger::{BlockLedger, Identity, Ledger, MemoryLedger};

const DTYPE: FloatDtype = FloatDtype::F32;

fn cfg(preprocessing_fraction: f64) -> FedConfig {
    FedConfig {
        dtype: DTYPE,
        num_features: 2,
        local_epochs: 1,
        batch_size: 16,
        preprocessing_fraction,
        training_fraction: 1.0,
        seed: 1,
    }
}

fn schema() -> Parameters {
    Parameters::new(vec![Tensor::zeros(vec![2])])
}

fn params_from(values: &[f32]) -> Parameters {
    Parameters::new(vec![Tensor::from_data(vec![2], values.to_vec()).unwrap()])
}

/// Adds one to every parameter element per step and records the
/// standardized features it was shown.
struct BumpTrainer {
    seen: Arc<Mutex<Vec<f32>>>,
}

impl Trainer for BumpTrainer {
    fn step(&mut self, params: &mut Parameters, batch: &Batch) -> f32 {
        self.seen.lock().unwrap().extend_from_slice(&batch.features);
        for tensor in params.tensors_mut() {
            for value in tensor.data_mut() {
                *value += 1.0;
            }
        }
        0.0
    }
}

fn client<L: Ledger>(
    name: &str,
    ledger: L,
    rows: &[(f32, f32)],
    seen: Arc<Mutex<Vec<f32>>>,
    config: &FedConfig,
) -> Client<L> {
    let features = rows.iter().flat_map(|&(a, b)| [a, b]).collect();
    let labels = vec![0; rows.len()];
    let partition = Partition::new(features, labels, 2).unwrap();
    Client::new(
        Identity::new(name),
        ledger,
        partition,
        Box::new(BumpTrainer { seen }),
        schema(),
        config.clone(),
    )
}

#[tokio::test]
async fn preprocess_produces_pooled_statistics() {
    let config = cfg(1.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let owner = ledger.account(Identity::new("server"));
    let server = Server::new(owner.clone(), schema(), config.clone());

    // Shards: A = {(0, 4), (2, 6)}, B = {(4, 8)}. Union of column 0 is
    // {0, 2, 4} with mean 2; union of column 1 is {4, 6, 8} with mean 6.
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut clients = vec![
        client("client-a", ledger.account(Identity::new("client-a")), &[(0.0, 4.0), (2.0, 6.0)], seen.clone(), &config),
        client("client-b", ledger.account(Identity::new("client-b")), &[(4.0, 8.0)], seen.clone(), &config),
    ];

    let mut driver = RoundDriver::new(config.clone());
    driver.preprocess(&mut clients, &server).await.unwrap();

    let mean = codec::decode_vector(&owner.current_mean().await.unwrap(), DTYPE, 2).unwrap();
    assert_eq!(mean, vec![2.0, 6.0]);

    let std = codec::decode_vector(&owner.current_std().await.unwrap(), DTYPE, 2).unwrap();
    // Population std of {0, 2, 4} (and of {4, 6, 8}) is sqrt(8/3).
    let expected = (8.0_f32 / 3.0).sqrt();
    assert!((std[0] - expected).abs() < 1e-6);
    assert!((std[1] - expected).abs() < 1e-6);
}

#[tokio::test]
async fn skip_preprocess_commits_identity_statistics() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let owner = ledger.account(Identity::new("server"));
    let server = Server::new(owner.clone(), schema(), config.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut clients = vec![client(
        "client-a",
        ledger.account(Identity::new("client-a")),
        &[(7.0, -3.0)],
        seen,
        &config,
    )];

    let mut driver = RoundDriver::new(config.clone());
    driver.preprocess(&mut clients, &server).await.unwrap();

    let mean = codec::decode_vector(&owner.current_mean().await.unwrap(), DTYPE, 2).unwrap();
    let std = codec::decode_vector(&owner.current_std().await.unwrap(), DTYPE, 2).unwrap();
    assert_eq!(mean, vec![0.0, 0.0]);
    assert_eq!(std, vec![1.0, 1.0]);
}

#[tokio::test]
async fn averaging_weights_by_data_size() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let a = ledger.account(Identity::new("client-a"));
    let b = ledger.account(Identity::new("client-b"));
    let mut server = Server::new(ledger.account(Identity::new("server")), schema(), config);

    let p1 = params_from(&[4.0, 8.0]);
    let p2 = params_from(&[8.0, 0.0]);
    let receipts = vec![
        a.local_update(0, 10, p1.encode(DTYPE)).await.unwrap(),
        b.local_update(0, 30, p2.encode(DTYPE)).await.unwrap(),
    ];

    server.average_updates(&receipts).await.unwrap();

    // 0.25 * P1 + 0.75 * P2
    let model = server.fetch_model().await.unwrap();
    assert_eq!(model.tensors()[0].data(), &[7.0, 2.0]);
    assert_eq!(a.current_round().await.unwrap(), 1);
    assert_eq!(a.current_data_size().await.unwrap(), 0);
}

#[tokio::test]
async fn repeated_sender_keeps_first_resolved_event() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let a = ledger.account(Identity::new("client-a"));
    let b = ledger.account(Identity::new("client-b"));
    let mut server = Server::new(ledger.account(Identity::new("server")), schema(), config);

    let p1 = params_from(&[4.0, 8.0]);
    let p2 = params_from(&[8.0, 0.0]);
    let p3 = params_from(&[-100.0, -100.0]);
    let receipts = vec![
        a.local_update(0, 10, p1.encode(DTYPE)).await.unwrap(),
        b.local_update(0, 30, p2.encode(DTYPE)).await.unwrap(),
        // Second submission from the same sender in one batch: discarded.
        a.local_update(0, 10, p3.encode(DTYPE)).await.unwrap(),
    ];

    server.average_updates(&receipts).await.unwrap();

    let model = server.fetch_model().await.unwrap();
    assert_eq!(model.tensors()[0].data(), &[7.0, 2.0]);
}

#[tokio::test]
async fn stale_round_updates_are_dropped() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let a = ledger.account(Identity::new("client-a"));
    let b = ledger.account(Identity::new("client-b"));
    let mut server = Server::new(ledger.account(Identity::new("server")), schema(), config);

    let p1 = params_from(&[4.0, 8.0]);
    let p2 = params_from(&[8.0, 0.0]);
    let receipts = vec![
        // Recorded for round 3 while the current round is 0.
        a.local_update(3, 10, p1.encode(DTYPE)).await.unwrap(),
        b.local_update(0, 30, p2.encode(DTYPE)).await.unwrap(),
    ];

    server.average_updates(&receipts).await.unwrap();

    // The stale contribution must not affect the result at all.
    let model = server.fetch_model().await.unwrap();
    assert_eq!(model.tensors()[0].data(), &[8.0, 0.0]);
}

#[tokio::test]
async fn malformed_payloads_are_discarded_per_contributor() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let a = ledger.account(Identity::new("client-a"));
    let b = ledger.account(Identity::new("client-b"));
    let mut server = Server::new(ledger.account(Identity::new("server")), schema(), config);

    let p2 = params_from(&[8.0, 0.0]);
    let receipts = vec![
        a.local_update(0, 10, vec![0xff; 3]).await.unwrap(),
        b.local_update(0, 30, p2.encode(DTYPE)).await.unwrap(),
    ];

    server.average_updates(&receipts).await.unwrap();

    let model = server.fetch_model().await.unwrap();
    assert_eq!(model.tensors()[0].data(), &[8.0, 0.0]);
}

#[tokio::test]
async fn aggregation_with_no_survivors_fails_fast() {
    let config = cfg(0.0);
    let ledger = MemoryLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let a = ledger.account(Identity::new("client-a"));
    let mut server = Server::new(ledger.account(Identity::new("server")), schema(), config);

    let receipts = vec![
        a.local_update(9, 10, params_from(&[1.0, 1.0]).encode(DTYPE))
            .await
            .unwrap(),
    ];

    assert!(matches!(
        server.average_updates(&receipts).await,
        Err(FedErr::EmptyInput)
    ));
    // Round did not advance.
    assert_eq!(a.current_round().await.unwrap(), 0);
}

#[tokio::test]
async fn full_run_over_block_ledger() {
    let config = cfg(1.0);
    let chain = BlockLedger::deploy(Identity::new("server"), schema().encode(DTYPE));
    let mut server = Server::new(chain.account(Identity::new("server")), schema(), config.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut clients = vec![
        client("client-a", chain.account(Identity::new("client-a")), &[(0.0, 5.0), (2.0, 5.0)], seen.clone(), &config),
        client("client-b", chain.account(Identity::new("client-b")), &[(4.0, 5.0)], seen.clone(), &config),
    ];

    let mut driver = RoundDriver::new(config.clone());
    driver.run(&mut clients, &mut server, 2).await.unwrap();

    // Every trainer adds 1.0 per round to a zero model, so the weighted
    // average is all-ones after round one and all-twos after round two.
    let owner = chain.account(Identity::new("server"));
    assert_eq!(owner.current_round().await.unwrap(), 2);
    let model = server.fetch_model().await.unwrap();
    assert_eq!(model.tensors()[0].data(), &[2.0, 2.0]);

    // Column 1 is constant, so its std is zero and the guard must have
    // mapped it to one: standardized values stay finite (and zero).
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|v| v.is_finite()));
    assert!(seen.chunks(2).all(|row| row[1] == 0.0));

    assert!(chain.verify());
}
