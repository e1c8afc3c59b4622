//! In-process provider with a fixed latency model
//! Deterministic addresses and hashes, real nonce bookkeeping

use super::{
    Call, FaucetRequest, FaucetToken, OwnerAccount, PreparedUserOperation, ReceiptStatus,
    SentUserOperation, SmartAccount, UserOperationProvider, UserOperationReceipt,
    UserOperationRequest,
};
use crate::config::SimulatorConfig;
use crate::error::BenchError;
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, TxHash, H256, U256};
use ethers::utils::keccak256;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Default)]
struct SimState {
    accounts_created: u64,
    nonces: HashMap<Address, U256>,
    /// user op hash -> (sender, transaction hash)
    pending: HashMap<H256, (Address, TxHash)>,
    funded: HashSet<(Address, FaucetToken)>,
}

/// Provider that answers locally after sleeping the configured latencies
pub struct SimulatedProvider {
    config: SimulatorConfig,
    state: Mutex<SimState>,
    faucet_requests: AtomicU64,
    sends: AtomicU64,
}

impl SimulatedProvider {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SimState::default()),
            faucet_requests: AtomicU64::new(0),
            sends: AtomicU64::new(0),
        }
    }

    pub fn faucet_requests(&self) -> u64 {
        self.faucet_requests.load(Ordering::Relaxed)
    }

    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::Relaxed)
    }

    pub fn nonce(&self, account: Address) -> U256 {
        self.state.lock().nonces.get(&account).copied().unwrap_or_default()
    }

    pub fn is_funded(&self, account: Address, token: FaucetToken) -> bool {
        self.state.lock().funded.contains(&(account, token))
    }

    fn next_address(&self, kind: &str) -> Address {
        let mut state = self.state.lock();
        state.accounts_created += 1;
        let seed = encode(&[
            Token::String(kind.to_string()),
            Token::Uint(U256::from(state.accounts_created)),
        ]);
        Address::from_slice(&keccak256(seed)[12..])
    }

    fn user_op_hash(request: &UserOperationRequest, nonce: U256) -> H256 {
        let calls = request
            .calls
            .iter()
            .map(|c: &Call| {
                Token::Tuple(vec![
                    Token::Address(c.to),
                    Token::Uint(c.value),
                    Token::Bytes(c.data.to_vec()),
                ])
            })
            .collect();

        H256::from(keccak256(encode(&[
            Token::Address(request.smart_account.address),
            Token::Uint(nonce),
            Token::Array(calls),
            Token::String(request.network.clone()),
        ])))
    }

    fn check_request(request: &UserOperationRequest) -> Result<(), BenchError> {
        if request.calls.is_empty() {
            return Err(BenchError::provider("user operation has no calls"));
        }
        if request.network.trim().is_empty() {
            return Err(BenchError::provider("network not specified"));
        }
        Ok(())
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl UserOperationProvider for SimulatedProvider {
    async fn create_account(&self) -> Result<OwnerAccount, BenchError> {
        pause(self.config.account_latency_ms).await;
        Ok(OwnerAccount {
            address: self.next_address("owner"),
        })
    }

    async fn create_smart_account(&self, owner: &OwnerAccount) -> Result<SmartAccount, BenchError> {
        pause(self.config.account_latency_ms).await;
        Ok(SmartAccount {
            address: self.next_address("smart"),
            owner: owner.address,
        })
    }

    async fn request_faucet(&self, request: &FaucetRequest) -> Result<TxHash, BenchError> {
        pause(self.config.faucet_latency_ms).await;
        self.faucet_requests.fetch_add(1, Ordering::Relaxed);

        if !request.network.contains("sepolia") {
            return Err(BenchError::provider(format!(
                "faucet not available on {}",
                request.network
            )));
        }

        self.state.lock().funded.insert((request.address, request.token));
        debug!("Faucet sent {} to {:?}", request.token.as_str(), request.address);

        Ok(H256::from(keccak256(encode(&[
            Token::String(request.token.as_str().to_string()),
            Token::Address(request.address),
        ]))))
    }

    async fn prepare_user_operation(
        &self,
        request: &UserOperationRequest,
    ) -> Result<PreparedUserOperation, BenchError> {
        pause(self.config.prepare_latency_ms).await;
        Self::check_request(request)?;

        let nonce = self.nonce(request.smart_account.address);
        Ok(PreparedUserOperation {
            user_op_hash: Self::user_op_hash(request, nonce),
            nonce,
        })
    }

    async fn sign(&self, owner: &OwnerAccount, hash: H256) -> Result<Bytes, BenchError> {
        pause(self.config.sign_latency_ms).await;

        let digest = keccak256(encode(&[
            Token::Address(owner.address),
            Token::FixedBytes(hash.as_bytes().to_vec()),
        ]));
        let mut signature = Vec::with_capacity(65);
        signature.extend_from_slice(&digest);
        signature.extend_from_slice(&keccak256(digest));
        signature.push(27);
        Ok(Bytes::from(signature))
    }

    async fn send_user_operation(
        &self,
        request: &UserOperationRequest,
    ) -> Result<SentUserOperation, BenchError> {
        // prepare + sign happen again inside send
        pause(
            self.config.prepare_latency_ms
                + self.config.sign_latency_ms
                + self.config.send_latency_ms,
        )
        .await;
        Self::check_request(request)?;

        let sender = request.smart_account.address;
        let user_op_hash = {
            let mut state = self.state.lock();
            let nonce = state.nonces.entry(sender).or_default();
            let hash = Self::user_op_hash(request, *nonce);
            *nonce += U256::one();

            let tx_hash = H256::from(keccak256(encode(&[
                Token::FixedBytes(hash.as_bytes().to_vec()),
                Token::String("included".to_string()),
            ])));
            state.pending.insert(hash, (sender, tx_hash));
            hash
        };

        self.sends.fetch_add(1, Ordering::Relaxed);
        Ok(SentUserOperation { user_op_hash })
    }

    async fn wait_for_user_operation(
        &self,
        smart_account: Address,
        user_op_hash: H256,
    ) -> Result<UserOperationReceipt, BenchError> {
        pause(self.config.receipt_latency_ms).await;

        let mut state = self.state.lock();
        match state.pending.remove(&user_op_hash) {
            Some((sender, tx_hash)) if sender == smart_account => Ok(UserOperationReceipt {
                status: ReceiptStatus::Complete,
                transaction_hash: Some(tx_hash),
            }),
            Some(entry) => {
                state.pending.insert(user_op_hash, entry);
                Err(BenchError::provider(format!(
                    "user operation {:?} was not sent by {:?}",
                    user_op_hash, smart_account
                )))
            }
            None => Err(BenchError::provider(format!(
                "unknown user operation {:?}",
                user_op_hash
            ))),
        }
    }
}
