//! Configuration module

use crate::types::{BenchmarkTags, OpType};
use anyhow::Context;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "USEROP_BENCH_CONFIG";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// What to benchmark
    pub benchmark: BenchmarkConfig,

    /// Pacing between trials and after funding
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Latency model of the in-process provider
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One benchmark run. Read-only once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkConfig {
    pub network: String,
    #[serde(rename = "op_type")]
    pub op_type: OpType,
    pub sponsored: bool,
    #[serde(default)]
    pub iterations: Option<u32>,
    pub destination_address: Address,
    /// Decimal amount in whole units (ETH, USDC)
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token_address: Option<Address>,
    #[serde(default)]
    pub paymaster_url: Option<String>,
}

impl BenchmarkConfig {
    pub fn new(network: impl Into<String>, op_type: OpType, destination_address: Address) -> Self {
        Self {
            network: network.into(),
            op_type,
            sponsored: false,
            iterations: None,
            destination_address,
            amount: None,
            token_address: None,
            paymaster_url: None,
        }
    }

    /// Effective trial count; absent or zero means one
    pub fn iterations(&self) -> u32 {
        match self.iterations {
            None | Some(0) => 1,
            Some(n) => n,
        }
    }

    pub fn tags(&self) -> BenchmarkTags {
        BenchmarkTags {
            network: self.network.clone(),
            op_type: self.op_type,
            sponsored: self.sponsored,
        }
    }

    /// Configured amount, or `default` when unset or blank
    pub fn amount_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.amount
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(default)
    }

    /// Testnets get faucet funding during setup
    pub fn is_testnet(&self) -> bool {
        self.network.contains("sepolia")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Pause between consecutive trials, keeps upstream rate limits happy
    pub inter_trial_delay_ms: u64,
    /// Pause after faucet funding before the first trial
    pub settle_delay_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            inter_trial_delay_ms: 1000,
            settle_delay_ms: 5000,
        }
    }
}

impl HarnessConfig {
    pub fn inter_trial_delay(&self) -> Duration {
        Duration::from_millis(self.inter_trial_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Per-call latencies for the simulated provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub account_latency_ms: u64,
    pub faucet_latency_ms: u64,
    pub prepare_latency_ms: u64,
    pub sign_latency_ms: u64,
    /// Transmit only; a send additionally pays prepare + sign
    pub send_latency_ms: u64,
    pub receipt_latency_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            account_latency_ms: 150,
            faucet_latency_ms: 300,
            prepare_latency_ms: 120,
            sign_latency_ms: 5,
            send_latency_ms: 400,
            receipt_latency_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_output: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Burn address on Base Sepolia, which sponsors gas automatically
        let burn = Address::from_low_u64_be(0xdead);

        let mut benchmark = BenchmarkConfig::new("base-sepolia", OpType::NativeTransfer, burn);
        benchmark.sponsored = true;
        benchmark.amount = Some("0.000001".to_string());
        benchmark.iterations = Some(20);

        Self {
            benchmark,
            harness: HarnessConfig::default(),
            simulator: SimulatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load config from environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| "config/config.json".to_string());

        if std::path::Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
