use std::{env, error::Error, fs::File, io::BufReader};

use codec::FloatDtype;
use federation::{Client, FedConfig, ModelRegistry, Partition, RoundDriver, Server, stats};
use ledger::{BlockLedger, Identity, Ledger, MemoryLedger};
use log::info;

use crate::{
    config::{Platform, RunConfig},
    data::DataSplit,
};

mod config;
mod data;
mod linear;

const OWNER: &str = "server";
const DEFAULT_CONFIG: &str = "fl.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let run: RunConfig = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
    info!("read config file: {path}");

    let dtype = FloatDtype::from_bits(run.external_bits)
        .ok_or_else(|| format!("unsupported external dtype width: {} bits", run.external_bits))?;

    let mut registry = ModelRegistry::new();
    linear::register(&mut registry, run.model.learning_rate, run.model.momentum);
    info!("using model: {}", run.model.name);

    let split = data::generate(&run.dataset, run.num_users, run.seed)?;
    info!(
        "training samples: {}, features: {}, labels: {}",
        split.partitions.iter().map(Partition::rows).sum::<usize>(),
        run.dataset.num_features,
        run.dataset.num_labels,
    );

    let fed = FedConfig {
        dtype,
        num_features: run.dataset.num_features,
        local_epochs: run.local_epochs,
        batch_size: run.batch_size,
        preprocessing_fraction: run.preprocessing_fraction,
        training_fraction: run.training_fraction,
        seed: run.seed,
    };

    // Weights start at zero, so deploying a fresh build matches every
    // participant's local schema exactly.
    let genesis = registry
        .build(&run.model.name, run.dataset.num_features, run.dataset.num_labels)?
        .params
        .encode(dtype);

    match run.platform {
        Platform::Memory => {
            info!("using in-memory ledger backend");
            let ledger = MemoryLedger::deploy(Identity::new(OWNER), genesis);
            let owner = ledger.account(Identity::new(OWNER));
            let accounts = client_accounts(run.num_users, |id| ledger.account(id));
            run_session(owner, accounts, &registry, &run, &fed, split).await?;
        }
        Platform::Chain => {
            info!("using block-chained ledger backend");
            let chain = BlockLedger::deploy(Identity::new(OWNER), genesis);
            let owner = chain.account(Identity::new(OWNER));
            let accounts = client_accounts(run.num_users, |id| chain.account(id));
            run_session(owner, accounts, &registry, &run, &fed, split).await?;
            if chain.verify() {
                info!("chain verified: every sealed block intact");
            } else {
                return Err("chain verification failed".into());
            }
        }
    }

    Ok(())
}

fn client_accounts<L>(num_users: usize, account: impl Fn(Identity) -> L) -> Vec<(Identity, L)> {
    (0..num_users)
        .map(|i| {
            let id = Identity::new(format!("client-{i}"));
            let handle = account(id.clone());
            (id, handle)
        })
        .collect()
}

async fn run_session<L: Ledger + Clone>(
    owner: L,
    accounts: Vec<(Identity, L)>,
    registry: &ModelRegistry,
    run: &RunConfig,
    fed: &FedConfig,
    split: DataSplit,
) -> Result<(), Box<dyn Error>> {
    let (num_features, num_labels) = (run.dataset.num_features, run.dataset.num_labels);

    let build = registry.build(&run.model.name, num_features, num_labels)?;
    let mut server = Server::new(owner.clone(), build.params, fed.clone());

    let mut clients = Vec::with_capacity(accounts.len());
    for ((identity, account), partition) in accounts.into_iter().zip(split.partitions) {
        let build = registry.build(&run.model.name, num_features, num_labels)?;
        clients.push(Client::new(
            identity,
            account,
            partition,
            build.trainer,
            build.params,
            fed.clone(),
        ));
    }

    let mut driver = RoundDriver::new(fed.clone());
    driver.preprocess(&mut clients, &server).await?;

    for epoch in 0..run.global_epochs {
        driver.train_round(&mut clients, &mut server).await?;
        if run.evaluate_per_epoch {
            report_validation(&owner, &mut server, &split.holdout, fed, epoch).await?;
        }
    }
    if !run.evaluate_per_epoch {
        report_validation(&owner, &mut server, &split.holdout, fed, run.global_epochs).await?;
    }

    Ok(())
}

async fn report_validation<L: Ledger>(
    owner: &L,
    server: &mut Server<L>,
    holdout: &Partition,
    fed: &FedConfig,
    epoch: usize,
) -> Result<(), Box<dyn Error>> {
    let mean = codec::decode_vector(&owner.current_mean().await?, fed.dtype, fed.num_features)?;
    let mut std = codec::decode_vector(&owner.current_std().await?, fed.dtype, fed.num_features)?;
    stats::guard_zero_std(&mut std);

    let model = server.fetch_model().await?;
    let (accuracy, loss) = linear::evaluate(model, holdout, &mean, &std);
    info!(epoch = epoch; "validation accuracy: {:.2}%, loss: {loss}", accuracy * 100.0);
    Ok(())
}
