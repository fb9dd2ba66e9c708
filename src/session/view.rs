//! Read-only projection of the session for presentation.

use super::state::SessionState;
use crate::config::SessionConfig;
use crate::error::ErrorNotice;
use crate::gateway::DonationRecord;
use crate::transaction::{DonationDraft, NATIVE_TOKEN_DECIMALS};
use crate::utils::{format_display_amount, short_address};
use crate::wallet::{ConnectionPhase, NetworkId};
use alloy_primitives::Address;
use serde::Serialize;

const EMPTY_LEDGER_HINT: &str = "No donations yet. Be the first to donate!";

/// Formatting settings for views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
	pub precision: u32,
	pub symbol: String,
	pub required_network: NetworkId,
}

impl From<&SessionConfig> for DisplayOptions {
	fn from(config: &SessionConfig) -> Self {
		Self {
			precision: config.display_precision,
			symbol: config.native_symbol.clone(),
			required_network: config.required_network,
		}
	}
}

impl Default for DisplayOptions {
	fn default() -> Self {
		DisplayOptions::from(&SessionConfig::default())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationView {
	pub index: u64,
	/// "You" for the connected account, otherwise the shortened address
	pub donor: String,
	pub recipient: String,
	pub donor_address: String,
	pub recipient_address: String,
	pub amount: String,
	pub timestamp: String,
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingView {
	pub recipient: String,
	pub amount: String,
	pub message: String,
	pub started_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
	pub phase: ConnectionPhase,
	pub account: Option<String>,
	pub account_short: Option<String>,
	pub network: Option<NetworkId>,
	pub required_network: NetworkId,
	pub network_mismatch: bool,
	pub balance: Option<String>,
	pub symbol: String,
	pub donations: Vec<DonationView>,
	/// The list may lag behind the chain
	pub stale: bool,
	/// Shown in place of an empty ledger once it has loaded
	pub empty_hint: Option<String>,
	pub pending: Option<PendingView>,
	pub draft: Option<DonationDraft>,
	pub error: Option<ErrorNotice>,
	pub busy: bool,
	pub can_donate: bool,
}

impl SessionView {
	pub fn project(state: &SessionState, display: &DisplayOptions) -> Self {
		let account = state.wallet.connected_account();
		let network_mismatch = state.wallet.is_connected()
			&& state
				.wallet
				.network
				.is_some_and(|network| network != display.required_network);
		let amount = |wei: u128| {
			format!(
				"{} {}",
				format_display_amount(wei, NATIVE_TOKEN_DECIMALS, display.precision),
				display.symbol
			)
		};
		let busy = state.busy();
		let empty_hint = (state.ledger.is_empty() && !state.syncing && !state.stale)
			.then(|| EMPTY_LEDGER_HINT.to_string());

		SessionView {
			phase: state.phase(),
			account: account.map(|a| a.to_string()),
			account_short: account.map(|a| short_address(&a.to_string())),
			network: state.wallet.network,
			required_network: display.required_network,
			network_mismatch,
			balance: state
				.wallet
				.balance_wei
				.filter(|_| state.wallet.is_connected())
				.map(&amount),
			symbol: display.symbol.clone(),
			donations: state
				.ledger
				.iter()
				.map(|record| project_donation(record, account, &amount))
				.collect(),
			stale: state.stale,
			empty_hint,
			pending: state.pending.as_ref().map(|pending| PendingView {
				recipient: short_address(&pending.recipient.to_string()),
				amount: amount(pending.amount_wei),
				message: pending.message.clone(),
				started_at: pending.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
			}),
			draft: state.draft.clone(),
			error: state.last_error.clone(),
			busy,
			can_donate: account.is_some() && !network_mismatch && !busy,
		}
	}
}

fn project_donation(
	record: &DonationRecord,
	account: Option<Address>,
	amount: &impl Fn(u128) -> String,
) -> DonationView {
	let label = |address: Address| {
		if Some(address) == account {
			"You".to_string()
		} else {
			short_address(&address.to_string())
		}
	};
	DonationView {
		index: record.index,
		donor: label(record.donor),
		recipient: label(record.recipient),
		donor_address: record.donor.to_string(),
		recipient_address: record.recipient.to_string(),
		amount: amount(record.amount_wei),
		timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
		message: record.message.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::wallet::WalletConnection;
	use chrono::{DateTime, Utc};

	fn record(index: u64, donor: Address, recipient: Address) -> DonationRecord {
		DonationRecord {
			index,
			donor,
			recipient,
			amount_wei: 500_000_000_000_000_000,
			timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
			message: "hello".to_string(),
		}
	}

	#[test]
	fn disconnected_view_is_empty() {
		let view = SessionView::project(&SessionState::default(), &DisplayOptions::default());
		assert_eq!(view.phase, ConnectionPhase::Disconnected);
		assert!(view.account.is_none());
		assert!(view.balance.is_none());
		assert!(!view.can_donate);
		assert!(!view.network_mismatch);
	}

	#[test]
	fn labels_own_donations_and_formats_amounts() {
		let me = Address::repeat_byte(0xaa);
		let other = Address::repeat_byte(0xbb);
		let mut state = SessionState::default();
		state.wallet.apply_connection(&WalletConnection {
			account: me,
			network: NetworkId::SEPOLIA,
			balance_wei: 1_500_000_000_000_000_000,
		});
		state.replace_ledger(vec![record(1, me, other), record(0, other, me)]);

		let view = SessionView::project(&state, &DisplayOptions::default());
		assert_eq!(view.balance.as_deref(), Some("1.5000 ETH"));
		assert_eq!(view.donations[0].donor, "You");
		assert_eq!(view.donations[0].recipient, short_address(&other.to_string()));
		assert_eq!(view.donations[1].recipient, "You");
		assert_eq!(view.donations[0].amount, "0.5000 ETH");
		assert_eq!(view.donations[0].timestamp, "2023-11-14 22:13:20 UTC");
		assert!(view.can_donate);
		assert!(view.empty_hint.is_none());
	}

	#[test]
	fn empty_ledger_shows_hint_once_loaded() {
		let mut state = SessionState::default();
		state.syncing = true;
		let view = SessionView::project(&state, &DisplayOptions::default());
		assert!(view.donations.is_empty());
		assert!(view.empty_hint.is_none());

		state.syncing = false;
		state.replace_ledger(Vec::new());
		let view = SessionView::project(&state, &DisplayOptions::default());
		assert_eq!(
			view.empty_hint.as_deref(),
			Some("No donations yet. Be the first to donate!")
		);

		state.stale = true;
		let view = SessionView::project(&state, &DisplayOptions::default());
		assert!(view.empty_hint.is_none());
	}

	#[test]
	fn wrong_network_blocks_donating() {
		let mut state = SessionState::default();
		state.wallet.apply_connection(&WalletConnection {
			account: Address::repeat_byte(0xaa),
			network: NetworkId::MAINNET,
			balance_wei: 0,
		});
		let view = SessionView::project(&state, &DisplayOptions::default());
		assert!(view.network_mismatch);
		assert!(!view.can_donate);
	}
}
