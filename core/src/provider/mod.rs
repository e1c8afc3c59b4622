//! User operation provider
//! The external service that creates smart accounts and submits their operations

pub mod simulated;

pub use simulated::SimulatedProvider;

use crate::error::BenchError;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TxHash, H256, U256};

/// Externally owned account controlling a smart account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerAccount {
    pub address: Address,
}

/// Smart contract account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartAccount {
    pub address: Address,
    pub owner: Address,
}

/// Faucet tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaucetToken {
    Eth,
    Usdc,
}

impl FaucetToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaucetToken::Eth => "eth",
            FaucetToken::Usdc => "usdc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FaucetRequest {
    pub address: Address,
    pub network: String,
    pub token: FaucetToken,
}

/// Single call inside a user operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct UserOperationRequest {
    pub smart_account: SmartAccount,
    pub network: String,
    pub calls: Vec<Call>,
    pub paymaster_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreparedUserOperation {
    pub user_op_hash: H256,
    pub nonce: U256,
}

#[derive(Debug, Clone)]
pub struct SentUserOperation {
    pub user_op_hash: H256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Complete,
    Failed,
}

#[derive(Debug, Clone)]
pub struct UserOperationReceipt {
    pub status: ReceiptStatus,
    pub transaction_hash: Option<TxHash>,
}

/// Account provisioning, funding and user operation submission.
///
/// Nonce bookkeeping is owned by the provider; callers only hold account
/// handles.
#[async_trait]
pub trait UserOperationProvider: Send + Sync {
    async fn create_account(&self) -> Result<OwnerAccount, BenchError>;

    async fn create_smart_account(&self, owner: &OwnerAccount) -> Result<SmartAccount, BenchError>;

    /// Testnet funding; returns the faucet transaction
    async fn request_faucet(&self, request: &FaucetRequest) -> Result<TxHash, BenchError>;

    /// Fill gas, nonce and paymaster data without submitting
    async fn prepare_user_operation(
        &self,
        request: &UserOperationRequest,
    ) -> Result<PreparedUserOperation, BenchError>;

    async fn sign(&self, owner: &OwnerAccount, hash: H256) -> Result<Bytes, BenchError>;

    /// Prepare, sign and submit in one call
    async fn send_user_operation(
        &self,
        request: &UserOperationRequest,
    ) -> Result<SentUserOperation, BenchError>;

    /// Block until the operation lands (or is dropped)
    async fn wait_for_user_operation(
        &self,
        smart_account: Address,
        user_op_hash: H256,
    ) -> Result<UserOperationReceipt, BenchError>;
}
