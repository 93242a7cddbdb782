use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{setup_logger, EndpointPool, KeyProvider, MetricsCollector, ProgressStore};
use dotenv::dotenv;
use ethers::signers::{LocalWallet, Signer};
use evm_airdrop::ledger::{rebind, resolve_tokens};
use evm_airdrop::{
    source, AirdropConfig, HttpConnector, Orchestrator, TelegramNotifier, TransferExecutor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Address list; defaults to the first *.csv in the working directory
    #[arg(long)]
    csv: Option<String>,

    /// Write run metrics as JSON to this path on exit
    #[arg(long)]
    export_metrics: Option<String>,

    /// Plan and check balances without sending transactions
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = setup_logger("logs")?;
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);
    let config = AirdropConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    info!(
        "Configuration loaded for chain ID: {} ({} RPC nodes, {} tokens)",
        config.chain_id,
        config.rpc_urls.len(),
        config.tokens.len()
    );

    let keys = KeyProvider::from_env()?;
    if keys.len() > 1 {
        warn!("{} keys configured, only the first one signs", keys.len());
    }
    let wallet = keys
        .first()
        .context("No private key configured")?
        .expose()
        .parse::<LocalWallet>()
        .context("Invalid private key")?
        .with_chain_id(config.chain_id);
    info!("Sender address: {:?}", wallet.address());

    let connector = HttpConnector::new(config.chain_id)?;
    let mut pool = EndpointPool::bootstrap(connector, &config.rpc_urls).await?;
    let conn = pool.current().await?;
    let targets = resolve_tokens(&config.tokens, Arc::clone(&conn)).await?;
    let tokens = rebind(&targets, &conn);

    let csv_path = match &args.csv {
        Some(path) => PathBuf::from(path),
        None => source::detect_csv_file(".")?,
    };
    let raw = source::read_address_column(&csv_path)?;

    let progress = ProgressStore::load(&config.progress_file);
    let notifier = TelegramNotifier::from_config(&config.telegram)?;
    let metrics = Arc::new(MetricsCollector::new());

    let executor = TransferExecutor::with_settings(wallet, config.chain_id, &config.transfer)
        .with_gas(config.gas)
        .with_commit_policy(config.commit_policy)
        .with_notifier(Arc::clone(&notifier))
        .with_metrics(Arc::clone(&metrics));

    let mut orchestrator = Orchestrator::new(pool, tokens, executor, progress)
        .with_settings(config.transfer.clone())
        .with_batch_size(config.batch_size)
        .with_dry_run(args.dry_run);

    let result = orchestrator.run(&raw).await;

    notifier.flush().await;
    if let Some(path) = &args.export_metrics {
        match metrics.export_to_file(path).await {
            Ok(()) => info!("Metrics written to {}", path),
            Err(e) => error!("Failed to write metrics to {}: {}", path, e),
        }
    }

    for status in orchestrator.pool().health_status() {
        info!(
            "RPC {}{}: {:?}, {} failures",
            status.url,
            if status.active { " (active)" } else { "" },
            status.status,
            status.failure_count
        );
    }

    let summary = result?;
    info!(
        "Done: {} batches, {} transfers, {} addresses paid ({} total in {})",
        summary.batches,
        summary.transfers,
        summary.addresses_paid,
        orchestrator.progress().len(),
        config.progress_file
    );
    Ok(())
}
