//! ERC-20 (USDC) transfer from a smart account

use super::SmartAccountSession;
use crate::bench::{BenchmarkOperation, TimingCollector};
use crate::config::{BenchmarkConfig, HarnessConfig};
use crate::error::BenchError;
use crate::provider::{Call, FaucetToken, UserOperationProvider};
use crate::types::OperationOutcome;
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H160, U256};
use ethers::utils::{id, parse_units};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_AMOUNT: &str = "0.01";

/// USDC decimals
pub const TOKEN_DECIMALS: u32 = 6;

/// USDC on Base Sepolia
pub const BASE_SEPOLIA_USDC: Address = H160([
    0x03, 0x6c, 0xbd, 0x53, 0x84, 0x2c, 0x54, 0x26, 0x63, 0x4e,
    0x79, 0x29, 0x54, 0x1e, 0xc2, 0x31, 0x8f, 0x3d, 0xcf, 0x7e,
]);

pub struct Erc20TransferBenchmark {
    provider: Arc<dyn UserOperationProvider>,
    settle_delay: Duration,
    session: Option<SmartAccountSession>,
}

impl Erc20TransferBenchmark {
    pub fn new(provider: Arc<dyn UserOperationProvider>) -> Self {
        Self {
            provider,
            settle_delay: HarnessConfig::default().settle_delay(),
            session: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn session(&self) -> Option<&SmartAccountSession> {
        self.session.as_ref()
    }

    /// Token amount in base units. Digits past the token's precision are
    /// dropped, never rounded.
    pub fn token_amount(amount: &str) -> Result<U256, BenchError> {
        let trimmed = amount.trim();
        if trimmed.starts_with('-') || !trimmed.is_ascii() {
            return Err(BenchError::InvalidAmount(amount.to_string()));
        }

        let truncated = match trimmed.split_once('.') {
            Some((whole, fraction)) if fraction.len() > TOKEN_DECIMALS as usize => {
                format!("{}.{}", whole, &fraction[..TOKEN_DECIMALS as usize])
            }
            _ => trimmed.to_string(),
        };

        let parsed = parse_units(&truncated, TOKEN_DECIMALS)
            .map_err(|e| BenchError::InvalidAmount(format!("{}: {}", amount, e)))?;
        Ok(parsed.into())
    }

    /// `transfer(address,uint256)` calldata
    pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
        let mut data = id("transfer(address,uint256)").to_vec();
        data.extend(encode(&[Token::Address(to), Token::Uint(amount)]));
        Bytes::from(data)
    }

    pub fn build_calls(config: &BenchmarkConfig) -> Result<Vec<Call>, BenchError> {
        let token = config.token_address.ok_or(BenchError::MissingTokenAddress)?;
        let amount = Self::token_amount(config.amount_or(DEFAULT_AMOUNT))?;

        Ok(vec![Call {
            to: token,
            value: U256::zero(),
            data: Self::transfer_calldata(config.destination_address, amount),
        }])
    }
}

#[async_trait]
impl BenchmarkOperation for Erc20TransferBenchmark {
    async fn setup_account(&mut self, config: &BenchmarkConfig) -> Result<(), BenchError> {
        info!("Setting up account for ERC-20 transfers...");

        let session = SmartAccountSession::create(self.provider.as_ref()).await?;

        // ETH pays gas, USDC is what gets transferred
        let mut tokens = vec![FaucetToken::Eth];
        if config.token_address.is_some() {
            tokens.push(FaucetToken::Usdc);
        }
        session
            .fund(self.provider.as_ref(), config, &tokens, self.settle_delay)
            .await?;
        self.session = Some(session);

        info!("Account setup complete");
        Ok(())
    }

    async fn execute_operation(
        &self,
        config: &BenchmarkConfig,
        timings: &mut TimingCollector,
    ) -> Result<OperationOutcome, BenchError> {
        let session = self.session.as_ref().ok_or(BenchError::NotInitialized)?;
        let calls = Self::build_calls(config)?;

        session
            .timed_user_operation(self.provider.as_ref(), config, calls, timings)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::BenchmarkHarness;
    use crate::config::SimulatorConfig;
    use crate::provider::SimulatedProvider;
    use crate::types::{OpType, ALL_ITERATIONS_FAILED};
    use std::str::FromStr;

    fn config() -> BenchmarkConfig {
        let dest = Address::from_str("0x000000000000000000000000000000000000dEaD").unwrap();
        let mut cfg = BenchmarkConfig::new("base-sepolia", OpType::Erc20Transfer, dest);
        cfg.sponsored = true;
        cfg.amount = Some("0.01".to_string());
        cfg.token_address = Some(BASE_SEPOLIA_USDC);
        cfg.iterations = Some(2);
        cfg
    }

    #[test]
    fn test_usdc_constant() {
        let parsed = Address::from_str("0x036CbD53842c5426634e7929541eC2318f3dCF7e").unwrap();
        assert_eq!(BASE_SEPOLIA_USDC, parsed);
    }

    #[test]
    fn test_token_amount_six_decimals() {
        assert_eq!(Erc20TransferBenchmark::token_amount("0.01").unwrap(), U256::from(10_000u64));
        assert_eq!(Erc20TransferBenchmark::token_amount("1").unwrap(), U256::from(1_000_000u64));
        assert_eq!(Erc20TransferBenchmark::token_amount("0.0000019").unwrap(), U256::from(1u64));
        assert!(Erc20TransferBenchmark::token_amount("-1").is_err());
        assert!(Erc20TransferBenchmark::token_amount("ten").is_err());
    }

    #[test]
    fn test_token_amount_surrounding_whitespace() {
        assert_eq!(Erc20TransferBenchmark::token_amount(" 0.01").unwrap(), U256::from(10_000u64));
        assert_eq!(Erc20TransferBenchmark::token_amount("0.01\n").unwrap(), U256::from(10_000u64));
        assert!(Erc20TransferBenchmark::token_amount(" -0.01").is_err());
    }

    #[test]
    fn test_token_amount_non_ascii_is_rejected() {
        for amount in ["0.12345é", "0.1234567é", "١.5"] {
            assert!(matches!(
                Erc20TransferBenchmark::token_amount(amount),
                Err(BenchError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_blank_amount_uses_default() {
        let mut cfg = config();
        cfg.amount = Some(String::new());
        let calls = Erc20TransferBenchmark::build_calls(&cfg).unwrap();
        let data = hex::encode(&calls[0].data);
        assert_eq!(&data[72..], format!("{:0>64}", "2710"));
    }

    #[test]
    fn test_transfer_calldata_layout() {
        let cfg = config();
        let calls = Erc20TransferBenchmark::build_calls(&cfg).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, BASE_SEPOLIA_USDC);
        assert_eq!(calls[0].value, U256::zero());

        let data = hex::encode(&calls[0].data);
        assert_eq!(data.len(), (4 + 32 + 32) * 2);
        assert!(data.starts_with("a9059cbb"));
        assert_eq!(&data[8..72], format!("{:0>64}", "000000000000000000000000000000000000dead"));
        assert_eq!(&data[72..], format!("{:0>64}", "2710"));
    }

    #[test]
    fn test_token_address_required() {
        let mut cfg = config();
        cfg.token_address = None;
        assert!(matches!(
            Erc20TransferBenchmark::build_calls(&cfg),
            Err(BenchError::MissingTokenAddress)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_requests_eth_and_usdc() {
        let provider = Arc::new(SimulatedProvider::new(SimulatorConfig::default()));
        let mut plugin = Erc20TransferBenchmark::new(provider.clone());

        plugin.setup_account(&config()).await.unwrap();
        let account = plugin.session().unwrap().smart_account.address;
        assert_eq!(provider.faucet_requests(), 2);
        assert!(provider.is_funded(account, FaucetToken::Eth));
        assert!(provider.is_funded(account, FaucetToken::Usdc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_fails_every_trial() {
        let provider = Arc::new(SimulatedProvider::new(SimulatorConfig::default()));
        let mut harness = BenchmarkHarness::new(Erc20TransferBenchmark::new(provider.clone()));
        let mut cfg = config();
        cfg.token_address = None;

        let result = harness.run_benchmark(&cfg).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(ALL_ITERATIONS_FAILED));
        // only ETH for gas
        assert_eq!(provider.faucet_requests(), 1);
        assert_eq!(provider.sends(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_against_simulator() {
        let provider = Arc::new(SimulatedProvider::new(SimulatorConfig::default()));
        let mut harness = BenchmarkHarness::new(Erc20TransferBenchmark::new(provider.clone()));

        let result = harness.run_benchmark(&config()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.tags.op_type, OpType::Erc20Transfer);
        assert!(result.operation_hash.is_some());
        assert_eq!(provider.sends(), 2);
    }
}
