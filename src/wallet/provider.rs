//! Wallet provider abstraction.
//!
//! The session only needs a handful of EIP-1193 calls from the wallet. Keeping them behind a
//! trait lets the controller run against the JSON-RPC client in production and an in-memory
//! ledger in tests.

use crate::rpc::{
	JsonRpcClient, RpcError, TransactionRequest, WalletEventStream, parse_quantity,
};
use alloy_primitives::Address;
use serde_json::json;
use std::str::FromStr;

/// Account access, balances and signing offered by a wallet.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
	/// Ask the wallet to expose its accounts (`eth_requestAccounts`). May prompt the user.
	async fn request_accounts(&self) -> Result<Vec<Address>, RpcError>;

	/// Chain id the wallet is currently on.
	async fn chain_id(&self) -> Result<u64, RpcError>;

	/// Native balance of `account` in wei.
	async fn balance(&self, account: Address) -> Result<u128, RpcError>;

	/// Sign and broadcast a transaction, returning its hash.
	async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError>;

	/// Stream of account and chain change notifications.
	async fn subscribe_events(&self) -> Result<WalletEventStream, RpcError>;

	/// Get the name of this provider for logging and diagnostics.
	fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl WalletProvider for JsonRpcClient {
	async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
		let raw: Vec<String> = self.request("eth_requestAccounts", json!([])).await?;
		raw.iter()
			.map(|account| {
				Address::from_str(account).map_err(|e| {
					RpcError::InvalidResponse(format!("bad account {}: {}", account, e))
				})
			})
			.collect()
	}

	async fn chain_id(&self) -> Result<u64, RpcError> {
		let raw: String = self.request("eth_chainId", json!([])).await?;
		let id = parse_quantity(&raw)?;
		u64::try_from(id).map_err(|_| RpcError::InvalidQuantity(raw))
	}

	async fn balance(&self, account: Address) -> Result<u128, RpcError> {
		let raw: String = self
			.request("eth_getBalance", json!([account.to_string(), "latest"]))
			.await?;
		parse_quantity(&raw)
	}

	async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
		self.request("eth_sendTransaction", json!([tx])).await
	}

	async fn subscribe_events(&self) -> Result<WalletEventStream, RpcError> {
		self.subscribe_wallet_events().await
	}

	fn name(&self) -> &'static str {
		"json-rpc"
	}
}
