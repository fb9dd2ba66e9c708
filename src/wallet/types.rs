use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

impl NetworkId {
	pub const MAINNET: NetworkId = NetworkId(1);
	pub const SEPOLIA: NetworkId = NetworkId(11_155_111);

	pub fn name(&self) -> Option<&'static str> {
		match self.0 {
			1 => Some("mainnet"),
			11_155_111 => Some("sepolia"),
			_ => None,
		}
	}
}

impl fmt::Display for NetworkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "{} ({})", self.0, name),
			None => write!(f, "{}", self.0),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

/// Result of a successful wallet handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConnection {
	pub account: Address,
	pub network: NetworkId,
	pub balance_wei: u128,
}

/// How a change of exposed accounts affects the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountChange {
	/// Access revoked; the session is now disconnected.
	Revoked,
	/// A different account became active and must be re-established.
	Switched(Address),
	Unchanged,
}

/// Wallet half of the session state.
///
/// `account`, `network` and `balance_wei` are only meaningful while `phase` is
/// [`ConnectionPhase::Connected`]; a disconnect clears all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
	pub phase: ConnectionPhase,
	pub account: Option<Address>,
	pub network: Option<NetworkId>,
	pub balance_wei: Option<u128>,
}

impl WalletState {
	pub fn begin_connect(&mut self) {
		self.phase = ConnectionPhase::Connecting;
	}

	pub fn apply_connection(&mut self, connection: &WalletConnection) {
		self.phase = ConnectionPhase::Connected;
		self.account = Some(connection.account);
		self.network = Some(connection.network);
		self.balance_wei = Some(connection.balance_wei);
	}

	pub fn disconnect(&mut self) {
		*self = Self::default();
	}

	pub fn is_connected(&self) -> bool {
		self.phase == ConnectionPhase::Connected
	}

	/// Active account, only while connected
	pub fn connected_account(&self) -> Option<Address> {
		if self.is_connected() { self.account } else { None }
	}
}
