//! UserOp Bench CLI
//! Usage: userop-bench [native_transfer|erc20_transfer]

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use userop_bench::config::LoggingConfig;
use userop_bench::plugins::erc20_transfer::BASE_SEPOLIA_USDC;
use userop_bench::{Config, OpType, SimulatedProvider};

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json_output {
        builder.json().try_init()
    } else {
        builder.with_file(true).with_line_number(true).try_init()
    }
    .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {}", e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    init_tracing(&config.logging)?;

    // Optional op type override
    let args: Vec<String> = env::args().collect();
    if let Some(arg) = args.get(1) {
        config.benchmark.op_type = arg
            .parse::<OpType>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    if config.benchmark.op_type == OpType::Erc20Transfer && config.benchmark.token_address.is_none() {
        config.benchmark.token_address = Some(BASE_SEPOLIA_USDC);
        config.benchmark.amount.get_or_insert_with(|| "0.01".to_string());
    }

    info!(
        "Starting {} benchmark on {} with {} iterations...",
        config.benchmark.op_type,
        config.benchmark.network,
        config.benchmark.iterations()
    );

    let provider = Arc::new(SimulatedProvider::new(config.simulator.clone()));
    let result = match userop_bench::run(&config, provider).await {
        Ok(result) => result,
        Err(e) => {
            error!("Benchmark aborted: {}", e);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        info!("No successful iterations");
    }
    Ok(())
}
