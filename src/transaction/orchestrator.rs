//! Donation submission workflow.
//!
//! A donation goes through `validate -> check session -> submit -> confirm -> re-synchronize`.
//! Any step may fail; once a transaction is submitted, the caller decides (by session
//! generation) whether the outcome still applies.

use super::draft::DonationDraft;
use crate::error::SessionError;
use crate::gateway::{DonationRecord, LedgerGateway, Receipt};
use crate::sync::DonationSynchronizer;
use crate::wallet::{WalletSession, WalletState};
use alloy_primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A validated donation bound to the account that sends it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationRequest {
	pub from: Address,
	pub recipient: Address,
	pub amount_wei: u128,
	pub message: String,
}

/// Result of a confirmed donation.
///
/// `ledger` and `balance_wei` are `None` when the post-confirmation refresh failed; the
/// donation itself still went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationOutcome {
	pub receipt: Receipt,
	pub ledger: Option<Vec<DonationRecord>>,
	pub balance_wei: Option<u128>,
}

impl DonationOutcome {
	pub fn is_stale(&self) -> bool {
		self.ledger.is_none() || self.balance_wei.is_none()
	}
}

pub struct TransactionOrchestrator {
	gateway: Arc<dyn LedgerGateway>,
	wallet: Arc<WalletSession>,
	synchronizer: Arc<DonationSynchronizer>,
	confirmation_timeout: Duration,
}

impl TransactionOrchestrator {
	pub fn new(
		gateway: Arc<dyn LedgerGateway>,
		wallet: Arc<WalletSession>,
		synchronizer: Arc<DonationSynchronizer>,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			gateway,
			wallet,
			synchronizer,
			confirmation_timeout,
		}
	}

	/// Validate the draft and check that the session can send it.
	///
	/// No network call is made; a failure here leaves nothing to undo.
	pub fn prepare(
		&self,
		draft: &DonationDraft,
		wallet: &WalletState,
	) -> Result<DonationRequest, SessionError> {
		let donation = draft.validate()?;
		let from = wallet.connected_account().ok_or(SessionError::NotConnected)?;
		self.wallet.check_network(wallet.network)?;

		Ok(DonationRequest {
			from,
			recipient: donation.recipient,
			amount_wei: donation.amount_wei,
			message: donation.message,
		})
	}

	/// Submit a prepared donation, wait for it to confirm, then reload the ledger and balance.
	///
	/// # Errors
	/// `WriteRejected`, `GatewayUnreachable`, `TransactionReverted` or `TransactionTimedOut`.
	/// Refresh failures after confirmation are not errors; see [`DonationOutcome`].
	pub async fn execute(
		&self,
		request: &DonationRequest,
		wallet: &WalletState,
	) -> Result<DonationOutcome, SessionError> {
		let handle = self
			.gateway
			.submit_donation(
				request.from,
				request.recipient,
				request.amount_wei,
				&request.message,
			)
			.await?;

		let receipt =
			match tokio::time::timeout(self.confirmation_timeout, self.gateway.await_confirmation(&handle))
				.await
			{
				Ok(result) => result?,
				Err(_) => {
					warn!("No confirmation for {} within {:?}", handle.tx_hash, self.confirmation_timeout);
					return Err(SessionError::TransactionTimedOut {
						tx_hash: handle.tx_hash,
						waited: self.confirmation_timeout,
					});
				}
			};
		info!("Donation {} confirmed", receipt.tx_hash);

		let ledger = match self.synchronizer.synchronize().await {
			Ok(records) => Some(records),
			Err(e) => {
				warn!("Ledger refresh after {} failed: {}", receipt.tx_hash, e);
				None
			}
		};
		let balance_wei = match self.wallet.refresh_balance(wallet).await {
			Ok(balance) => balance,
			Err(e) => {
				warn!("Balance refresh after {} failed: {}", receipt.tx_hash, e);
				None
			}
		};

		Ok(DonationOutcome {
			receipt,
			ledger,
			balance_wei,
		})
	}

	/// [`prepare`](Self::prepare) followed by [`execute`](Self::execute).
	pub async fn submit(
		&self,
		draft: &DonationDraft,
		wallet: &WalletState,
	) -> Result<DonationOutcome, SessionError> {
		let request = self.prepare(draft, wallet)?;
		self.execute(&request, wallet).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::MockLedger;
	use crate::wallet::{NetworkId, WalletConnection};

	const ETH: u128 = 1_000_000_000_000_000_000;
	const RECIPIENT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

	fn donor() -> Address {
		Address::repeat_byte(0xd0)
	}

	fn setup(mock: &MockLedger, timeout: Duration) -> TransactionOrchestrator {
		let gateway: Arc<dyn LedgerGateway> = Arc::new(mock.clone());
		let wallet = Arc::new(WalletSession::new(Arc::new(mock.clone()), NetworkId::SEPOLIA));
		let synchronizer = Arc::new(DonationSynchronizer::new(gateway.clone(), 4));
		TransactionOrchestrator::new(gateway, wallet, synchronizer, timeout)
	}

	fn connected(network: NetworkId) -> WalletState {
		let mut wallet = WalletState::default();
		wallet.apply_connection(&WalletConnection {
			account: donor(),
			network,
			balance_wei: 2 * ETH,
		});
		wallet
	}

	#[tokio::test]
	async fn confirmed_donation_refreshes_ledger_and_balance() {
		let mock = MockLedger::new(NetworkId::SEPOLIA).with_account(donor(), 2 * ETH);
		mock.set_gas_price(10);
		let orchestrator = setup(&mock, Duration::from_secs(5));

		let outcome = orchestrator
			.submit(
				&DonationDraft::new(RECIPIENT, "0.5", "keep going"),
				&connected(NetworkId::SEPOLIA),
			)
			.await
			.unwrap();

		let ledger = outcome.ledger.clone().unwrap();
		assert_eq!(ledger.len(), 1);
		assert_eq!(ledger[0].donor, donor());
		assert_eq!(ledger[0].amount_wei, ETH / 2);
		assert_eq!(ledger[0].message, "keep going");
		assert_eq!(outcome.balance_wei, Some(2 * ETH - ETH / 2 - outcome.receipt.fee_wei()));
		assert_eq!(outcome.receipt.fee_wei(), 210_000);
		assert!(!outcome.is_stale());
	}

	#[tokio::test]
	async fn validation_and_session_errors_make_no_write() {
		let mock = MockLedger::new(NetworkId::SEPOLIA).with_account(donor(), 2 * ETH);
		let orchestrator = setup(&mock, Duration::from_secs(5));

		let invalid = orchestrator
			.submit(&DonationDraft::new("not-an-address", "1", ""), &connected(NetworkId::SEPOLIA))
			.await;
		assert!(matches!(invalid, Err(SessionError::ValidationError { .. })));

		let disconnected = orchestrator
			.submit(&DonationDraft::new(RECIPIENT, "1", ""), &WalletState::default())
			.await;
		assert_eq!(disconnected, Err(SessionError::NotConnected));

		let wrong_network = orchestrator
			.submit(&DonationDraft::new(RECIPIENT, "1", ""), &connected(NetworkId::MAINNET))
			.await;
		assert!(matches!(wrong_network, Err(SessionError::WrongNetwork { .. })));

		assert_eq!(mock.write_calls(), 0);
	}

	#[tokio::test]
	async fn rejected_and_reverted_writes_leave_ledger_unchanged() {
		let mock = MockLedger::new(NetworkId::SEPOLIA).with_account(donor(), 2 * ETH);
		let orchestrator = setup(&mock, Duration::from_secs(5));
		let draft = DonationDraft::new(RECIPIENT, "0.1", "");
		let wallet = connected(NetworkId::SEPOLIA);

		mock.reject_writes(true);
		assert!(matches!(
			orchestrator.submit(&draft, &wallet).await,
			Err(SessionError::WriteRejected(_))
		));

		mock.reject_writes(false);
		mock.revert_writes(true);
		assert!(matches!(
			orchestrator.submit(&draft, &wallet).await,
			Err(SessionError::TransactionReverted { .. })
		));
		assert_eq!(mock.donation_records().len(), 0);
	}

	#[tokio::test]
	async fn unconfirmed_write_times_out() {
		let mock = MockLedger::new(NetworkId::SEPOLIA).with_account(donor(), 2 * ETH);
		mock.hang_confirmations(true);
		let orchestrator = setup(&mock, Duration::from_millis(50));

		let result = orchestrator
			.submit(&DonationDraft::new(RECIPIENT, "0.1", ""), &connected(NetworkId::SEPOLIA))
			.await;
		assert!(matches!(
			result,
			Err(SessionError::TransactionTimedOut { waited, .. }) if waited == Duration::from_millis(50)
		));
	}

	#[tokio::test]
	async fn failed_refresh_marks_outcome_stale() {
		let mock = MockLedger::new(NetworkId::SEPOLIA).with_account(donor(), 2 * ETH);
		mock.fail_fetch_at(Some(0));
		let orchestrator = setup(&mock, Duration::from_secs(5));

		let outcome = orchestrator
			.submit(&DonationDraft::new(RECIPIENT, "0.1", ""), &connected(NetworkId::SEPOLIA))
			.await
			.unwrap();
		assert!(outcome.ledger.is_none());
		assert!(outcome.is_stale());
		assert_eq!(mock.donation_records().len(), 1);
	}
}
