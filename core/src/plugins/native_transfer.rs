//! Native (ETH) transfer from a smart account

use super::SmartAccountSession;
use crate::bench::{BenchmarkOperation, TimingCollector};
use crate::config::{BenchmarkConfig, HarnessConfig};
use crate::error::BenchError;
use crate::provider::{Call, FaucetToken, UserOperationProvider};
use crate::types::OperationOutcome;
use async_trait::async_trait;
use ethers::types::{Bytes, U256};
use ethers::utils::parse_ether;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_AMOUNT_ETH: &str = "0.001";

pub struct NativeTransferBenchmark {
    provider: Arc<dyn UserOperationProvider>,
    settle_delay: Duration,
    session: Option<SmartAccountSession>,
}

impl NativeTransferBenchmark {
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

    /// Plain value transfer to the destination
    pub fn build_calls(config: &BenchmarkConfig) -> Result<Vec<Call>, BenchError> {
        let amount = config.amount_or(DEFAULT_AMOUNT_ETH);
        let value: U256 = parse_ether(amount)
            .map_err(|e| BenchError::InvalidAmount(format!("{}: {}", amount, e)))?;

        Ok(vec![Call {
            to: config.destination_address,
            value,
            data: Bytes::new(),
        }])
    }
}

#[async_trait]
impl BenchmarkOperation for NativeTransferBenchmark {
    async fn setup_account(&mut self, config: &BenchmarkConfig) -> Result<(), BenchError> {
        info!("Setting up account...");

        let session = SmartAccountSession::create(self.provider.as_ref()).await?;
        // needed even when a paymaster sponsors gas
        session
            .fund(self.provider.as_ref(), config, &[FaucetToken::Eth], self.settle_delay)
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
