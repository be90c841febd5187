//! JSON-RPC 2.0 envelopes and the narrow chain surface the monitor needs.
//!
//! Quantities are `0x`-prefixed hex strings on the wire. Parsing never
//! collapses an unparseable value into zero: callers get `None`/`Err`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CallError, CallErrorKind};

/// `eth_blockNumber`.
pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
/// `eth_getBlockByNumber`.
pub const METHOD_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Outgoing request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> JsonRpcRequest<'a> {
    #[must_use]
    pub const fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Error object inside a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Incoming response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// `Some(Value::Null)` for `"result": null`, `None` when the field is absent.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Split into the result payload or a classified error.
    ///
    /// # Errors
    /// `rpc_error` for an error object, `parse_error` when neither field is present.
    pub fn into_result(self) -> Result<Value, CallError> {
        if let Some(err) = self.error {
            return Err(CallError::rpc(err.code, err.message));
        }
        // null is a valid result (unknown block)
        self.result.ok_or_else(|| {
            CallError::new(
                CallErrorKind::ParseError,
                "response carries neither result nor error",
            )
        })
    }
}

/// Block selector for `eth_getBlockByNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Number(u64),
    Latest,
    Earliest,
    Pending,
    Safe,
    Finalized,
}

impl BlockTag {
    /// Wire form of the tag.
    #[must_use]
    pub fn to_param(self) -> String {
        match self {
            Self::Number(n) => format!("{n:#x}"),
            Self::Latest => "latest".to_string(),
            Self::Earliest => "earliest".to_string(),
            Self::Pending => "pending".to_string(),
            Self::Safe => "safe".to_string(),
            Self::Finalized => "finalized".to_string(),
        }
    }
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            other => f.write_str(&other.to_param()),
        }
    }
}

/// Params for `eth_getBlockByNumber`.
#[must_use]
pub fn block_by_number_params(tag: BlockTag, full_transactions: bool) -> Value {
    Value::Array(vec![
        Value::String(tag.to_param()),
        Value::Bool(full_transactions),
    ])
}

/// The subset of a block the monitor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: Option<String>,
    pub timestamp: Option<u64>,
    /// `None` when the block omits its transaction list.
    pub transaction_count: Option<usize>,
    pub gas_used: Option<u64>,
    pub base_fee_per_gas: Option<u128>,
}

impl Block {
    /// Decode a block object from an `eth_getBlockByNumber` result.
    ///
    /// # Errors
    /// `parse_error` if the result is null or `number`/`hash` are missing or malformed.
    pub fn from_value(value: &Value) -> Result<Self, CallError> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Null => {
                return Err(CallError::new(
                    CallErrorKind::ParseError,
                    "block not found (null result)",
                ));
            }
            _ => {
                return Err(CallError::new(
                    CallErrorKind::ParseError,
                    "block result is not an object",
                ));
            }
        };

        let number = obj
            .get("number")
            .and_then(Value::as_str)
            .and_then(parse_quantity_u64)
            .ok_or_else(|| CallError::new(CallErrorKind::ParseError, "missing block number"))?;
        let hash = obj
            .get("hash")
            .and_then(Value::as_str)
            .filter(|h| is_hex_hash(h))
            .ok_or_else(|| CallError::new(CallErrorKind::ParseError, "missing block hash"))?
            .to_lowercase();

        Ok(Self {
            number,
            hash,
            parent_hash: obj
                .get("parentHash")
                .and_then(Value::as_str)
                .map(str::to_lowercase),
            timestamp: obj
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(parse_quantity_u64),
            transaction_count: obj
                .get("transactions")
                .and_then(Value::as_array)
                .map(Vec::len),
            gas_used: obj
                .get("gasUsed")
                .and_then(Value::as_str)
                .and_then(parse_quantity_u64),
            base_fee_per_gas: obj
                .get("baseFeePerGas")
                .and_then(Value::as_str)
                .and_then(parse_quantity_u128),
        })
    }
}

/// Decode an `eth_blockNumber` result.
///
/// # Errors
/// `parse_error` if the value is not a hex quantity.
pub fn decode_block_number(value: &Value) -> Result<u64, CallError> {
    value
        .as_str()
        .and_then(parse_quantity_u64)
        .ok_or_else(|| {
            CallError::new(
                CallErrorKind::ParseError,
                format!("invalid block number: {value}"),
            )
        })
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Parse a `0x`-prefixed hex quantity.
#[must_use]
pub fn parse_quantity_u64(s: &str) -> Option<u64> {
    let digits = strip_hex_prefix(s)?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a `0x`-prefixed hex quantity that may exceed `u64`.
#[must_use]
pub fn parse_quantity_u128(s: &str) -> Option<u128> {
    let digits = strip_hex_prefix(s)?;
    if digits.is_empty() {
        return None;
    }
    u128::from_str_radix(digits, 16).ok()
}

/// Whether `s` looks like `0x` followed by hex digits.
#[must_use]
pub fn is_hex_hash(s: &str) -> bool {
    strip_hex_prefix(s).is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_hexdigit()))
}
