//! Ledger gateway: the only code that talks to the donation contract.
//!
//! Reads the donation count and individual records, submits donations and waits for their
//! confirmation. Implementations translate every lower-level failure into a [`SessionError`].

pub mod contract;
pub mod types;

pub use contract::DonationContractGateway;
pub use types::*;

use crate::error::SessionError;
use alloy_primitives::Address;

#[async_trait::async_trait]
pub trait LedgerGateway: Send + Sync {
	/// Number of donations recorded in the ledger.
	async fn donation_count(&self) -> Result<u64, SessionError>;

	/// Record at `index`, where `0 <= index < donation_count()`.
	///
	/// # Errors
	/// `IndexOutOfRange` when no record exists at `index`.
	async fn donation_at(&self, index: u64) -> Result<DonationRecord, SessionError>;

	/// Submit a donation of `amount_wei` from `from` to `recipient`. Returns once the
	/// transaction has been handed to the network, not when it is confirmed.
	async fn submit_donation(
		&self,
		from: Address,
		recipient: Address,
		amount_wei: u128,
		message: &str,
	) -> Result<TransactionHandle, SessionError>;

	/// Wait until the transaction is included.
	///
	/// # Errors
	/// `TransactionReverted` if it was included but failed, `TransactionTimedOut` if no receipt
	/// showed up within the configured bound.
	async fn await_confirmation(&self, handle: &TransactionHandle) -> Result<Receipt, SessionError>;
}
