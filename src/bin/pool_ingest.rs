use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinSet;
use tracing::{error, info};

use raydium_pool_ingest::rpc::SolanaRpc;
use raydium_pool_ingest::store::connect_database;
use raydium_pool_ingest::{Config, FetchConfig, IngestOutcome, IngestPipeline, logging};

/// Decode Raydium AMM v4 pool-creation transactions and store the pools.
#[derive(Parser, Debug)]
#[command(name = "pool-ingest", version)]
struct Args {
    /// Transaction signatures (base58) to ingest.
    #[arg(required = true)]
    signatures: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();
    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let sink = match connect_database(&config).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "MongoDB connection failed");
            return ExitCode::FAILURE;
        }
    };

    let rpc = SolanaRpc::new(config.solana_rpc_url.clone());
    let rpc_url = rpc.url();

    let pipeline = Arc::new(
        IngestPipeline::new(
            Arc::new(rpc),
            Arc::new(sink),
            config.raydium_amm_program_id.clone(),
        )
        .with_fetch_config(FetchConfig::inclusive(config.commitment)),
    );
    info!(
        rpc = %rpc_url,
        program_id = %pipeline.program_id(),
        commitment = %config.commitment,
        "starting ingestion"
    );

    let mut tasks = JoinSet::new();
    for signature in args.signatures {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move {
            let outcome = pipeline.ingest(&signature).await;
            (signature, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((signature, IngestOutcome::Ingested(pool))) => {
                info!(
                    %signature,
                    amm_id = %pool.amm_id,
                    coin_mint = %pool.coin_mint,
                    pc_mint = %pool.pc_mint,
                    "pool ingested"
                );
            }
            Ok((signature, IngestOutcome::Skipped(reason))) => {
                info!(%signature, %reason, "skipped");
            }
            Err(e) => error!(error = %e, "ingest task failed"),
        }
    }

    let stats = pipeline.stats().snapshot();
    info!(
        ingested = stats.ingested,
        skipped = stats.skipped,
        address_faults = stats.address_faults,
        write_failures = stats.write_failures,
        "done"
    );
    ExitCode::SUCCESS
}
