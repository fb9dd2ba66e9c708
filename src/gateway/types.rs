use crate::rpc::{RpcError, TransactionReceipt, parse_quantity};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};

/// One donation as stored by the contract. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationRecord {
	/// Position in the ledger (0-based, in append order)
	pub index: u64,
	pub donor: Address,
	pub recipient: Address,
	pub amount_wei: u128,
	/// Block time of the donating transaction
	pub timestamp: DateTime<Utc>,
	pub message: String,
}

/// A submitted, not yet confirmed, write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
	pub tx_hash: String,
	pub from: Address,
	pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
	pub tx_hash: String,
	pub block_number: Option<u64>,
	pub gas_used: u128,
	pub effective_gas_price: u128,
}

impl Receipt {
	/// Gas fee paid by the sender in wei.
	pub fn fee_wei(&self) -> u128 {
		self.gas_used.saturating_mul(self.effective_gas_price)
	}
}

impl TryFrom<TransactionReceipt> for Receipt {
	type Error = RpcError;

	fn try_from(receipt: TransactionReceipt) -> Result<Self, Self::Error> {
		let block_number = receipt
			.block_number
			.as_deref()
			.map(parse_quantity)
			.transpose()?
			.map(|n| u64::try_from(n).map_err(|_| RpcError::InvalidQuantity(n.to_string())))
			.transpose()?;
		let gas_used = receipt.gas_used.as_deref().map(parse_quantity).transpose()?;
		let effective_gas_price = receipt
			.effective_gas_price
			.as_deref()
			.map(parse_quantity)
			.transpose()?;

		Ok(Receipt {
			tx_hash: receipt.transaction_hash,
			block_number,
			gas_used: gas_used.unwrap_or_default(),
			effective_gas_price: effective_gas_price.unwrap_or_default(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn receipt_fee_multiplies_gas_and_price() {
		let rpc_receipt: TransactionReceipt = serde_json::from_value(serde_json::json!({
			"transactionHash": "0xabc",
			"blockNumber": "0x10",
			"status": "0x1",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x3b9aca00"
		}))
		.unwrap();
		let receipt = Receipt::try_from(rpc_receipt).unwrap();
		assert_eq!(receipt.block_number, Some(16));
		assert_eq!(receipt.fee_wei(), 21_000 * 1_000_000_000);
	}
}
