//! Donation contract gateway over JSON-RPC.
//!
//! Reads go through `eth_call` on the configured endpoint. Writes are signed and broadcast by
//! the wallet (`eth_sendTransaction`), then confirmed by polling `eth_getTransactionReceipt`
//! with exponential backoff, bounded by the confirmation timeout.

use super::LedgerGateway;
use super::types::*;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::rpc::{JsonRpcClient, RpcError, TransactionReceipt, TransactionRequest, decode_hex_data};
use crate::wallet::WalletProvider;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, sol};
use backoff::ExponentialBackoff;
use backoff::future::retry;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

sol! {
	function getDonationsCount() external view returns (uint256);
	function getDonation(uint256 index) external view returns (address donor, address recipient, uint256 amount, uint256 timestamp, string message);
	function donate(address recipient, string message) external payable;
}

pub struct DonationContractGateway {
	rpc: JsonRpcClient,
	/// Wallet that signs and broadcasts donations
	signer: Arc<dyn WalletProvider>,
	contract: Option<Address>,
	receipt_poll_interval: Duration,
	confirmation_timeout: Duration,
}

impl DonationContractGateway {
	pub fn new(
		rpc: JsonRpcClient,
		signer: Arc<dyn WalletProvider>,
		contract: Option<Address>,
		receipt_poll_interval: Duration,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			rpc,
			signer,
			contract,
			receipt_poll_interval,
			confirmation_timeout,
		}
	}

	pub fn from_config(
		rpc: JsonRpcClient,
		signer: Arc<dyn WalletProvider>,
		config: &SessionConfig,
	) -> Self {
		Self::new(
			rpc,
			signer,
			config.contract_address,
			config.receipt_poll_interval,
			config.confirmation_timeout,
		)
	}

	fn contract(&self) -> Result<Address, SessionError> {
		self.contract.ok_or_else(|| {
			SessionError::GatewayUnreachable("Donation contract address is not configured".to_string())
		})
	}

	async fn call(&self, contract: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
		let raw: String = self
			.rpc
			.request(
				"eth_call",
				json!([
					{ "to": contract.to_string(), "data": format!("0x{}", hex::encode(data)) },
					"latest"
				]),
			)
			.await?;
		decode_hex_data(&raw)
	}

	fn backoff_policy(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			initial_interval: self.receipt_poll_interval,
			current_interval: self.receipt_poll_interval,
			max_interval: self.receipt_poll_interval * 8,
			multiplier: 1.5,
			max_elapsed_time: Some(self.confirmation_timeout),
			..ExponentialBackoff::default()
		}
	}
}

#[async_trait::async_trait]
impl LedgerGateway for DonationContractGateway {
	async fn donation_count(&self) -> Result<u64, SessionError> {
		let contract = self.contract()?;
		let data = self
			.call(contract, getDonationsCountCall {}.abi_encode())
			.await
			.map_err(classify_read_error)?;
		decode_count(&data)
	}

	async fn donation_at(&self, index: u64) -> Result<DonationRecord, SessionError> {
		let contract = self.contract()?;
		let call = getDonationCall {
			index: U256::from(index),
		};
		let data = self
			.call(contract, call.abi_encode())
			.await
			.map_err(|e| {
				if e.is_revert() {
					SessionError::IndexOutOfRange { index }
				} else {
					classify_read_error(e)
				}
			})?;
		decode_donation(index, &data)
	}

	async fn submit_donation(
		&self,
		from: Address,
		recipient: Address,
		amount_wei: u128,
		message: &str,
	) -> Result<TransactionHandle, SessionError> {
		let contract = self.contract()?;
		let call = donateCall {
			recipient,
			message: message.to_string(),
		};
		let tx = TransactionRequest::new(from, contract, amount_wei, &call.abi_encode());

		info!(
			"Submitting donation of {} wei from {} to {} via {}",
			amount_wei,
			from,
			recipient,
			self.signer.name()
		);
		let tx_hash = self
			.signer
			.send_transaction(&tx)
			.await
			.map_err(classify_write_error)?;
		info!("Donation transaction submitted: {}", tx_hash);

		Ok(TransactionHandle {
			tx_hash,
			from,
			submitted_at: Utc::now(),
		})
	}

	async fn await_confirmation(&self, handle: &TransactionHandle) -> Result<Receipt, SessionError> {
		let rpc = self.rpc.clone();
		let tx_hash = handle.tx_hash.clone();
		let poll = retry(self.backoff_policy(), move || {
			let rpc = rpc.clone();
			let tx_hash = tx_hash.clone();
			async move {
				match rpc
					.request::<Option<TransactionReceipt>>(
						"eth_getTransactionReceipt",
						json!([tx_hash]),
					)
					.await
				{
					Ok(Some(receipt)) => Ok(receipt),
					Ok(None) => {
						debug!("Transaction {} still pending", tx_hash);
						Err(backoff::Error::transient(RpcError::NoData))
					}
					Err(e) => {
						debug!("Receipt poll for {} failed: {}", tx_hash, e);
						Err(backoff::Error::transient(e))
					}
				}
			}
		});

		let timed_out = || SessionError::TransactionTimedOut {
			tx_hash: handle.tx_hash.clone(),
			waited: self.confirmation_timeout,
		};
		let receipt = match tokio::time::timeout(self.confirmation_timeout, poll).await {
			Ok(Ok(receipt)) => receipt,
			Ok(Err(e)) => {
				warn!("Gave up waiting for {}: {}", handle.tx_hash, e);
				return Err(timed_out());
			}
			Err(_) => return Err(timed_out()),
		};

		if !receipt.succeeded() {
			warn!("Transaction {} reverted", handle.tx_hash);
			return Err(SessionError::TransactionReverted {
				tx_hash: handle.tx_hash.clone(),
			});
		}

		let receipt = Receipt::try_from(receipt).map_err(classify_read_error)?;
		info!(
			"Transaction {} confirmed in block {}",
			receipt.tx_hash,
			receipt
				.block_number
				.map(|n| n.to_string())
				.unwrap_or_else(|| "?".to_string())
		);
		Ok(receipt)
	}
}

fn classify_read_error(error: RpcError) -> SessionError {
	SessionError::GatewayUnreachable(error.to_string())
}

fn classify_write_error(error: RpcError) -> SessionError {
	if error.is_transport() {
		SessionError::GatewayUnreachable(error.to_string())
	} else {
		SessionError::WriteRejected(error.to_string())
	}
}

fn malformed(error: impl std::fmt::Display) -> SessionError {
	SessionError::GatewayUnreachable(format!("Malformed contract response: {}", error))
}

pub(crate) fn decode_count(data: &[u8]) -> Result<u64, SessionError> {
	let count = getDonationsCountCall::abi_decode_returns(data, true).map_err(malformed)?;
	u64::try_from(count._0).map_err(|_| malformed("donation count does not fit in u64"))
}

pub(crate) fn decode_donation(index: u64, data: &[u8]) -> Result<DonationRecord, SessionError> {
	let raw = getDonationCall::abi_decode_returns(data, true).map_err(malformed)?;
	let amount_wei = u128::try_from(raw.amount)
		.map_err(|_| malformed(format!("amount of donation {} does not fit in u128", index)))?;
	let seconds = u64::try_from(raw.timestamp)
		.ok()
		.and_then(|s| i64::try_from(s).ok())
		.ok_or_else(|| malformed(format!("timestamp of donation {} out of range", index)))?;
	let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0)
		.ok_or_else(|| malformed(format!("timestamp {} out of range", seconds)))?;

	Ok(DonationRecord {
		index,
		donor: raw.donor,
		recipient: raw.recipient,
		amount_wei,
		timestamp,
		message: raw.message,
	})
}
