//! Wallet session: connection handshake, network check and balance lookups.

use super::provider::WalletProvider;
use super::types::*;
use crate::error::SessionError;
use crate::rpc::RpcError;
use crate::transaction::NATIVE_TOKEN_DECIMALS;
use crate::utils::format_token_amount;
use alloy_primitives::Address;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct WalletSession {
	provider: Arc<dyn WalletProvider>,
	required_network: NetworkId,
}

impl WalletSession {
	pub fn new(provider: Arc<dyn WalletProvider>, required_network: NetworkId) -> Self {
		Self {
			provider,
			required_network,
		}
	}

	pub fn provider(&self) -> Arc<dyn WalletProvider> {
		self.provider.clone()
	}

	/// Request account access and read the active account, network and balance.
	///
	/// The first exposed account becomes the active one. A wallet that answers with no accounts
	/// is treated the same as a refusal.
	///
	/// # Errors
	/// * `UserRejected` - the user declined the access prompt
	/// * `ProviderUnavailable` - no wallet endpoint, or it failed to answer
	pub async fn connect(&self) -> Result<WalletConnection, SessionError> {
		info!("Requesting account access from {} wallet", self.provider.name());

		let accounts = self
			.provider
			.request_accounts()
			.await
			.map_err(classify_provider_error)?;
		let account = *accounts.first().ok_or_else(|| {
			SessionError::UserRejected("Wallet did not expose any account".to_string())
		})?;

		let network = NetworkId(
			self.provider
				.chain_id()
				.await
				.map_err(classify_provider_error)?,
		);
		let balance_wei = self
			.provider
			.balance(account)
			.await
			.map_err(classify_provider_error)?;

		info!(
			"Wallet connected: account={}, network={}, balance={} ETH",
			account,
			network,
			format_token_amount(balance_wei, NATIVE_TOKEN_DECIMALS)
		);

		Ok(WalletConnection {
			account,
			network,
			balance_wei,
		})
	}

	/// Check that the wallet is on the network writes are allowed on.
	pub fn check_network(&self, network: Option<NetworkId>) -> Result<(), SessionError> {
		match network {
			Some(actual) if actual == self.required_network => Ok(()),
			Some(actual) => Err(SessionError::WrongNetwork {
				expected: self.required_network,
				actual,
			}),
			None => Err(SessionError::NotConnected),
		}
	}

	/// Re-read the balance of the connected account.
	///
	/// A disconnected wallet keeps whatever balance it had (none), without a provider call.
	pub async fn refresh_balance(&self, wallet: &WalletState) -> Result<Option<u128>, SessionError> {
		let Some(account) = wallet.connected_account() else {
			debug!("Skipping balance refresh, wallet not connected");
			return Ok(wallet.balance_wei);
		};

		let balance = self
			.provider
			.balance(account)
			.await
			.map_err(classify_provider_error)?;
		debug!("Balance of {}: {} wei", account, balance);
		Ok(Some(balance))
	}

	/// Apply an `accountsChanged` notification to the wallet state.
	pub fn accounts_changed(&self, wallet: &mut WalletState, accounts: &[Address]) -> AccountChange {
		match accounts.first() {
			None => {
				if wallet.phase != ConnectionPhase::Disconnected {
					info!("Wallet revoked account access");
				}
				wallet.disconnect();
				AccountChange::Revoked
			}
			Some(&account) if wallet.is_connected() && wallet.account == Some(account) => {
				AccountChange::Unchanged
			}
			Some(&account) => {
				info!("Active account changed to {}", account);
				wallet.phase = ConnectionPhase::Connecting;
				wallet.account = Some(account);
				wallet.balance_wei = None;
				AccountChange::Switched(account)
			}
		}
	}

	/// Apply a `chainChanged` notification. Returns `true` when the session must be
	/// re-established on the new network.
	pub fn chain_changed(&self, wallet: &mut WalletState, network: NetworkId) -> bool {
		if wallet.phase == ConnectionPhase::Disconnected || wallet.network == Some(network) {
			return false;
		}
		if network != self.required_network {
			warn!(
				"Wallet switched to {}, writes require {}",
				network, self.required_network
			);
		}
		wallet.network = Some(network);
		true
	}
}

fn classify_provider_error(error: RpcError) -> SessionError {
	if error.is_user_rejection() {
		SessionError::UserRejected(error.to_string())
	} else {
		SessionError::ProviderUnavailable(error.to_string())
	}
}
