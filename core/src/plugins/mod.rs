//! Benchmark plugins
//! One plugin per operation type, all sharing the same phase sequence

pub mod erc20_transfer;
pub mod native_transfer;

pub use erc20_transfer::Erc20TransferBenchmark;
pub use native_transfer::NativeTransferBenchmark;

use crate::bench::{BenchmarkOperation, Phase, TimingCollector};
use crate::config::{BenchmarkConfig, HarnessConfig};
use crate::error::BenchError;
use crate::provider::{
    Call, FaucetRequest, FaucetToken, OwnerAccount, ReceiptStatus, SmartAccount,
    UserOperationProvider, UserOperationRequest,
};
use crate::types::{OpType, OperationOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Owner + smart account created during setup and reused by every trial
#[derive(Debug, Clone)]
pub struct SmartAccountSession {
    pub owner: OwnerAccount,
    pub smart_account: SmartAccount,
}

impl SmartAccountSession {
    pub async fn create(provider: &dyn UserOperationProvider) -> Result<Self, BenchError> {
        let owner = provider.create_account().await?;
        info!("Created owner account: {:?}", owner.address);

        let smart_account = provider.create_smart_account(&owner).await?;
        info!("Created Smart Account: {:?}", smart_account.address);

        Ok(Self { owner, smart_account })
    }

    /// Testnet faucet funding followed by the settle delay.
    /// No-op outside testnets.
    pub async fn fund(
        &self,
        provider: &dyn UserOperationProvider,
        config: &BenchmarkConfig,
        tokens: &[FaucetToken],
        settle_delay: Duration,
    ) -> Result<(), BenchError> {
        if !config.is_testnet() || tokens.is_empty() {
            return Ok(());
        }

        for token in tokens {
            info!("Requesting faucet funds for {}...", token.as_str());
            provider
                .request_faucet(&FaucetRequest {
                    address: self.smart_account.address,
                    network: config.network.clone(),
                    token: *token,
                })
                .await?;
        }

        info!("Waiting for funds to be available...");
        tokio::time::sleep(settle_delay).await;
        Ok(())
    }

    fn request(&self, config: &BenchmarkConfig, calls: Vec<Call>) -> UserOperationRequest {
        UserOperationRequest {
            smart_account: self.smart_account.clone(),
            network: config.network.clone(),
            calls,
            paymaster_url: config.paymaster_url.clone(),
        }
    }

    /// Standalone prepare, standalone sign, then send + receipt under the
    /// end-to-end timer. Payload construction happens before this, outside
    /// every timer.
    pub async fn timed_user_operation(
        &self,
        provider: &dyn UserOperationProvider,
        config: &BenchmarkConfig,
        calls: Vec<Call>,
        timings: &mut TimingCollector,
    ) -> Result<OperationOutcome, BenchError> {
        let request = self.request(config, calls);

        let prepared = timings
            .measure(Phase::Prepare, provider.prepare_user_operation(&request))
            .await?;

        timings
            .measure(Phase::Sign, provider.sign(&self.owner, prepared.user_op_hash))
            .await?;

        let e2e_start = Instant::now();

        let sent = timings
            .measure(Phase::Send, provider.send_user_operation(&request))
            .await?;

        let receipt = timings
            .measure(
                Phase::Receipt,
                provider.wait_for_user_operation(self.smart_account.address, sent.user_op_hash),
            )
            .await?;

        timings.record(Phase::EndToEnd, e2e_start.elapsed());

        Ok(OperationOutcome {
            transaction_hash: match receipt.status {
                ReceiptStatus::Complete => receipt.transaction_hash,
                ReceiptStatus::Failed => None,
            },
            operation_hash: Some(sent.user_op_hash),
        })
    }
}

/// Plugin for an operation type
pub fn for_op_type(
    op_type: OpType,
    provider: Arc<dyn UserOperationProvider>,
    harness: &HarnessConfig,
) -> Result<Box<dyn BenchmarkOperation>, BenchError> {
    match op_type {
        OpType::NativeTransfer => Ok(Box::new(
            NativeTransferBenchmark::new(provider).with_settle_delay(harness.settle_delay()),
        )),
        OpType::Erc20Transfer => Ok(Box::new(
            Erc20TransferBenchmark::new(provider).with_settle_delay(harness.settle_delay()),
        )),
        OpType::SwapV4 | OpType::Mint => Err(BenchError::UnsupportedOperation(op_type)),
    }
}
