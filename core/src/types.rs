//! Core types for user operation benchmarks

use crate::bench::TimingPhases;
use chrono::{DateTime, Utc};
use ethers::types::{TxHash, H256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diagnostic attached to a run in which no trial succeeded.
pub const ALL_ITERATIONS_FAILED: &str = "All iterations failed";

/// Operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    NativeTransfer,
    Erc20Transfer,
    SwapV4,
    Mint,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::NativeTransfer => "native_transfer",
            OpType::Erc20Transfer => "erc20_transfer",
            OpType::SwapV4 => "swap_v4",
            OpType::Mint => "mint",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::NativeTransfer, Self::Erc20Transfer, Self::SwapV4, Self::Mint]
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation type: {}", s))
    }
}

/// Categorization carried from the config into the result.
/// Run-specific parameters (iterations, amounts) are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkTags {
    pub network: String,
    pub op_type: OpType,
    pub sponsored: bool,
}

/// What a single successful trial hands back to the harness
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOutcome {
    pub transaction_hash: Option<TxHash>,
    pub operation_hash: Option<H256>,
}

/// Benchmark result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub timestamp: DateTime<Utc>,
    pub timings: TimingPhases,
    pub tags: BenchmarkTags,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_hash: Option<H256>,
}

impl BenchmarkResult {
    /// Result for a run where every trial failed
    pub fn all_failed(tags: BenchmarkTags) -> Self {
        Self {
            timestamp: Utc::now(),
            timings: TimingPhases::default(),
            tags,
            success: false,
            error: Some(ALL_ITERATIONS_FAILED.to_string()),
            transaction_hash: None,
            operation_hash: None,
        }
    }

    pub fn succeeded(tags: BenchmarkTags, timings: TimingPhases, last: OperationOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            timings,
            tags,
            success: true,
            error: None,
            transaction_hash: last.transaction_hash,
            operation_hash: last.operation_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_type_wire_names() {
        for op in OpType::all() {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op));
            assert_eq!(op.as_str().parse::<OpType>().unwrap(), op);
        }
        assert!("transfer".parse::<OpType>().is_err());
    }

    #[test]
    fn test_failed_result_shape() {
        let tags = BenchmarkTags {
            network: "base-sepolia".to_string(),
            op_type: OpType::NativeTransfer,
            sponsored: true,
        };
        let result = BenchmarkResult::all_failed(tags);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], ALL_ITERATIONS_FAILED);
        assert_eq!(json["tags"]["op_type"], "native_transfer");
        assert_eq!(json["timings"]["pure_send_ms"], 0.0);
        assert!(json.get("transactionHash").is_none());
        assert!(json.get("operationHash").is_none());
    }

    #[test]
    fn test_success_result_carries_hashes() {
        let tags = BenchmarkTags {
            network: "base".to_string(),
            op_type: OpType::Erc20Transfer,
            sponsored: false,
        };
        let outcome = OperationOutcome {
            transaction_hash: Some(H256::repeat_byte(0xaa)),
            operation_hash: Some(H256::repeat_byte(0xbb)),
        };
        let result = BenchmarkResult::succeeded(tags, TimingPhases::default(), outcome);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["transactionHash"], format!("0x{}", "aa".repeat(32)));
        assert_eq!(json["operationHash"], format!("0x{}", "bb".repeat(32)));
    }
}
