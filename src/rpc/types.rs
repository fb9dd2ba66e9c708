//! Types for JSON-RPC wallet and node integration

use crate::wallet::NetworkId;
use alloy_primitives::Address;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// EIP-1193 "User Rejected Request"
pub const USER_REJECTED_CODE: i64 = 4001;
/// Error code nodes use for `execution reverted`
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Response envelope of a JSON-RPC 2.0 call.
///
/// A missing `result` deserializes to `null`, which is a valid answer for calls such as
/// `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
	/// Request id echoed by the server; absent on notifications.
	#[serde(default)]
	pub id: Option<serde_json::Value>,
	/// Call result.
	#[serde(default)]
	pub result: serde_json::Value,
	/// Error object, set when the call failed.
	#[serde(default)]
	pub error: Option<JsonRpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Push message delivered on a subscription (`eth_subscription`).
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionNotification {
	pub method: String,
	pub params: SubscriptionParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionParams {
	pub subscription: String,
	pub result: serde_json::Value,
}

/// Wallet notification topics the client subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTopic {
	AccountsChanged,
	ChainChanged,
}

impl SubscriptionTopic {
	pub fn as_str(&self) -> &'static str {
		match self {
			SubscriptionTopic::AccountsChanged => "accountsChanged",
			SubscriptionTopic::ChainChanged => "chainChanged",
		}
	}
}

/// Notification emitted by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
	/// The set of exposed accounts changed; empty means access was revoked.
	AccountsChanged(Vec<Address>),
	/// The wallet switched to another chain.
	ChainChanged(NetworkId),
}

/// Stream of wallet notifications. Each item is either an event or a decoding/transport error.
pub type WalletEventStream = Pin<Box<dyn Stream<Item = Result<WalletEvent, RpcError>> + Send>>;

/// Transaction fields passed to `eth_sendTransaction`. Gas is left to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
	pub from: String,
	pub to: String,
	/// Attached value in wei as a hex quantity.
	pub value: String,
	/// ABI-encoded call data as 0x-prefixed hex.
	pub data: String,
}

impl TransactionRequest {
	pub fn new(from: Address, to: Address, value_wei: u128, data: &[u8]) -> Self {
		Self {
			from: from.to_string(),
			to: to.to_string(),
			value: to_quantity(value_wei),
			data: format!("0x{}", hex::encode(data)),
		}
	}
}

/// Receipt returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: String,
	#[serde(default)]
	pub block_number: Option<String>,
	/// `0x1` on success, `0x0` on revert. Absent before Byzantium.
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub gas_used: Option<String>,
	#[serde(default)]
	pub effective_gas_price: Option<String>,
}

impl TransactionReceipt {
	pub fn succeeded(&self) -> bool {
		match &self.status {
			Some(status) => parse_quantity(status).map(|s| s == 1).unwrap_or(false),
			None => true,
		}
	}
}

/// Parse a hex quantity such as `0x1bc16d674ec80000`. `0x` alone is zero.
pub fn parse_quantity(raw: &str) -> Result<u128, RpcError> {
	let digits = raw
		.strip_prefix("0x")
		.or_else(|| raw.strip_prefix("0X"))
		.ok_or_else(|| RpcError::InvalidQuantity(raw.to_string()))?;
	if digits.is_empty() {
		return Ok(0);
	}
	u128::from_str_radix(digits, 16).map_err(|_| RpcError::InvalidQuantity(raw.to_string()))
}

pub fn to_quantity(value: u128) -> String {
	format!("{:#x}", value)
}

/// Decode 0x-prefixed hex data returned by `eth_call`.
pub fn decode_hex_data(raw: &str) -> Result<Vec<u8>, RpcError> {
	let digits = raw.strip_prefix("0x").unwrap_or(raw);
	hex::decode(digits).map_err(|e| RpcError::InvalidResponse(format!("bad hex data: {}", e)))
}

/// Error types for JSON-RPC calls and wallet subscriptions
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("No data returned")]
	NoData,

	#[error("Connection error: {0}")]
	ConnectionError(String),

	#[error("WebSocket error: {0}")]
	WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Invalid quantity: {0}")]
	InvalidQuantity(String),

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error("Subscription error: {0}")]
	SubscriptionError(String),
}

impl RpcError {
	pub fn is_user_rejection(&self) -> bool {
		matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
	}

	pub fn is_revert(&self) -> bool {
		match self {
			RpcError::Rpc { code, message } => {
				*code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert")
			}
			_ => false,
		}
	}

	/// The endpoint could not be reached or answered garbage at the transport level
	pub fn is_transport(&self) -> bool {
		matches!(
			self,
			RpcError::ConnectionError(_) | RpcError::WebSocketError(_) | RpcError::HttpError(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_quantities() {
		assert_eq!(parse_quantity("0x0").unwrap(), 0);
		assert_eq!(parse_quantity("0x").unwrap(), 0);
		assert_eq!(parse_quantity("0xaa36a7").unwrap(), 11_155_111);
		assert!(parse_quantity("1234").is_err());
		assert!(parse_quantity("0xzz").is_err());
		assert_eq!(to_quantity(11_155_111), "0xaa36a7");
	}

	#[test]
	fn classifies_rpc_errors() {
		let rejected = RpcError::Rpc {
			code: 4001,
			message: "User denied transaction signature".into(),
		};
		assert!(rejected.is_user_rejection());
		assert!(!rejected.is_transport());

		let reverted = RpcError::Rpc {
			code: -32000,
			message: "execution reverted: Invalid index".into(),
		};
		assert!(reverted.is_revert());
		assert!(RpcError::ConnectionError("refused".into()).is_transport());
	}

	#[test]
	fn reads_receipt_status() {
		let receipt: TransactionReceipt = serde_json::from_value(serde_json::json!({
			"transactionHash": "0xabc",
			"blockNumber": "0x10",
			"status": "0x0",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x3b9aca00"
		}))
		.unwrap();
		assert!(!receipt.succeeded());
		assert_eq!(receipt.block_number.as_deref(), Some("0x10"));

		let legacy: TransactionReceipt =
			serde_json::from_value(serde_json::json!({ "transactionHash": "0xdef" })).unwrap();
		assert!(legacy.succeeded());
	}

	#[test]
	fn builds_transaction_request() {
		let from = Address::repeat_byte(0x11);
		let to = Address::repeat_byte(0x22);
		let request = TransactionRequest::new(from, to, 250_000_000_000_000_000, &[0xde, 0xad]);
		assert_eq!(request.value, "0x3782dace9d90000");
		assert_eq!(request.data, "0xdead");
		let json = serde_json::to_value(&request).unwrap();
		assert!(json.get("from").is_some());
		assert!(json.get("to").is_some());
	}
}
