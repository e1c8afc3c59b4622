//! Error taxonomy for benchmark runs

use crate::types::OpType;
use thiserror::Error;

/// Errors raised by the harness, the plugins and the operation provider.
///
/// Only `Setup` escapes `run_benchmark`, and `UnsupportedOperation` escapes
/// plugin selection; every other variant is caught at the trial boundary and
/// turned into log output.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("account setup failed: {0}")]
    Setup(#[source] Box<BenchError>),

    #[error("Accounts not initialized")]
    NotInitialized,

    #[error("Token address is required for ERC-20 transfers")]
    MissingTokenAddress,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("no benchmark plugin for operation type {0}")]
    UnsupportedOperation(OpType),

    #[error("trial panicked: {0}")]
    Panicked(String),
}

impl BenchError {
    /// Wrap a plugin setup failure as a fatal error.
    pub fn setup(inner: BenchError) -> Self {
        match inner {
            already @ BenchError::Setup(_) => already,
            other => BenchError::Setup(Box::new(other)),
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        BenchError::Provider(msg.into())
    }
}
