use crate::error::{ErrorNotice, SessionError};
use crate::gateway::DonationRecord;
use crate::transaction::{DonationDraft, DonationRequest};
use crate::wallet::{ConnectionPhase, WalletState};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};

/// Donation currently between submission and confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDonation {
	pub recipient: Address,
	pub amount_wei: u128,
	pub message: String,
	pub started_at: DateTime<Utc>,
}

impl From<&DonationRequest> for PendingDonation {
	fn from(request: &DonationRequest) -> Self {
		Self {
			recipient: request.recipient,
			amount_wei: request.amount_wei,
			message: request.message.clone(),
			started_at: Utc::now(),
		}
	}
}

/// Everything the controller knows about the session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
	/// Bumped by every wallet event that invalidates in-flight work
	pub generation: u64,
	pub wallet: WalletState,
	/// Last successful snapshot, newest first
	pub ledger: Vec<DonationRecord>,
	/// Bumped on every snapshot replacement
	pub ledger_version: u64,
	/// The last synchronization attempt failed; `ledger` is older than the chain
	pub stale: bool,
	/// A ledger synchronization is running
	pub syncing: bool,
	pub pending: Option<PendingDonation>,
	pub draft: Option<DonationDraft>,
	pub last_error: Option<ErrorNotice>,
}

impl SessionState {
	pub fn phase(&self) -> ConnectionPhase {
		self.wallet.phase
	}

	/// Invalidate all in-flight work. Returns the new generation.
	pub fn supersede(&mut self) -> u64 {
		self.generation += 1;
		self.pending = None;
		self.syncing = false;
		self.generation
	}

	pub fn is_current(&self, generation: u64) -> bool {
		self.generation == generation
	}

	/// Back to disconnected. The ledger snapshot and draft are kept.
	pub fn clear_connection(&mut self) {
		self.wallet.disconnect();
		self.pending = None;
		self.syncing = false;
	}

	pub fn replace_ledger(&mut self, records: Vec<DonationRecord>) {
		self.ledger = records;
		self.ledger_version += 1;
		self.stale = false;
	}

	pub fn record_error(&mut self, error: &SessionError) {
		self.last_error = Some(ErrorNotice::from(error));
	}

	pub fn busy(&self) -> bool {
		self.phase() == ConnectionPhase::Connecting || self.pending.is_some() || self.syncing
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn supersede_bumps_generation_and_drops_pending() {
		let mut state = SessionState {
			pending: Some(PendingDonation {
				recipient: Address::repeat_byte(0x02),
				amount_wei: 1,
				message: String::new(),
				started_at: Utc::now(),
			}),
			syncing: true,
			..SessionState::default()
		};
		assert!(state.busy());

		let generation = state.supersede();
		assert_eq!(generation, 1);
		assert!(state.is_current(1));
		assert!(!state.is_current(0));
		assert!(state.pending.is_none());
		assert!(!state.busy());
	}

	#[test]
	fn replacing_ledger_clears_stale() {
		let mut state = SessionState {
			stale: true,
			..SessionState::default()
		};
		state.replace_ledger(Vec::new());
		assert!(!state.stale);
		assert_eq!(state.ledger_version, 1);
	}
}
