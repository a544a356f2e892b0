//! # Engine API Messages
//!
//! The subset of the execution engine JSON-RPC API the driver consumes and the
//! co-hosted mock engine serves: V1 new-payload, forkchoice-updated and
//! get-payload.

use serde::{Deserialize, Serialize};

use crate::primitives::{quantity, Address, Hash, PayloadId};

pub const ENGINE_NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";

/// Execution status reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
            Self::InvalidBlockHash => "INVALID_BLOCK_HASH",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatusV1 {
    pub status: ExecutionStatus,
    pub latest_valid_hash: Option<Hash>,
    pub validation_error: Option<String>,
}

impl PayloadStatusV1 {
    pub fn valid(latest_valid_hash: Hash) -> Self {
        Self {
            status: ExecutionStatus::Valid,
            latest_valid_hash: Some(latest_valid_hash),
            validation_error: None,
        }
    }

    pub fn rejected(status: ExecutionStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            latest_valid_hash: None,
            validation_error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceStateV1 {
    pub head_block_hash: Hash,
    pub safe_block_hash: Hash,
    pub finalized_block_hash: Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV1 {
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub prev_randao: Hash,
    pub suggested_fee_recipient: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceUpdatedResult {
    pub payload_status: PayloadStatusV1,
    pub payload_id: Option<PayloadId>,
}

// =============================================================================
// JSON-RPC ENVELOPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: serde_json::Value::from(id),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const UNKNOWN_PAYLOAD: i64 = -38001;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognised_status_decodes_as_unknown() {
        let status: ExecutionStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, ExecutionStatus::Unknown);
        let status: ExecutionStatus = serde_json::from_str("\"INVALID_BLOCK_HASH\"").unwrap();
        assert_eq!(status, ExecutionStatus::InvalidBlockHash);
    }

    #[test]
    fn test_forkchoice_result_without_payload_id() {
        let json = serde_json::json!({
            "payloadStatus": {"status": "VALID", "latestValidHash": null, "validationError": null},
            "payloadId": null,
        });
        let result: ForkchoiceUpdatedResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.payload_status.status, ExecutionStatus::Valid);
        assert!(result.payload_id.is_none());
    }

    #[test]
    fn test_attributes_wire_format() {
        let attrs = PayloadAttributesV1 {
            timestamp: 12,
            prev_randao: Hash::zero(),
            suggested_fee_recipient: Address::zero(),
        };
        let json = serde_json::to_value(attrs).unwrap();
        assert_eq!(json["timestamp"], "0xc");
        assert!(json.get("suggestedFeeRecipient").is_some());
    }
}
