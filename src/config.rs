//! Session configuration from environment variables
//!
//! Controls the JSON-RPC endpoints, the donation contract, the network writes are allowed on and
//! the timing of confirmation waits. Defaults target a local wallet RPC on Sepolia.

use crate::wallet::NetworkId;
use alloy_primitives::Address;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Sepolia testnet
pub const DEFAULT_REQUIRED_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:1248";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {var}: {reason}")]
	InvalidValue { var: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// JSON-RPC endpoint of the wallet provider (HTTP)
	pub rpc_url: String,
	/// WebSocket endpoint for account/chain notifications
	pub ws_url: Option<String>,
	/// Deployed donation contract; reads and writes fail with `GatewayUnreachable` while unset
	pub contract_address: Option<Address>,
	/// Chain id the wallet must be on before any write is attempted
	pub required_network: NetworkId,
	/// Upper bound on waiting for a transaction receipt
	pub confirmation_timeout: Duration,
	/// Initial interval between receipt polls
	pub receipt_poll_interval: Duration,
	/// Parallel record fetches during a ledger synchronization
	pub sync_concurrency: usize,
	/// Timeout for a single JSON-RPC request
	pub request_timeout: Duration,
	/// Fractional digits shown for amounts and balances
	pub display_precision: u32,
	/// Native unit symbol shown beside amounts
	pub native_symbol: String,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			rpc_url: DEFAULT_RPC_URL.to_string(),
			ws_url: None,
			contract_address: None,
			required_network: NetworkId(DEFAULT_REQUIRED_CHAIN_ID),
			confirmation_timeout: Duration::from_secs(120),
			receipt_poll_interval: Duration::from_secs(2),
			sync_concurrency: 8,
			request_timeout: Duration::from_secs(30),
			display_precision: 4,
			native_symbol: "ETH".to_string(),
		}
	}
}

impl SessionConfig {
	/// Load configuration from environment variables
	///
	/// Environment variables:
	/// - `DONATION_RPC_URL`: wallet JSON-RPC endpoint (default `http://127.0.0.1:1248`)
	/// - `DONATION_WS_URL`: WebSocket endpoint for wallet notifications (optional)
	/// - `DONATION_CONTRACT_ADDRESS`: deployed donation contract (optional)
	/// - `DONATION_REQUIRED_CHAIN_ID`: chain id writes are allowed on (default 11155111)
	/// - `DONATION_CONFIRMATION_TIMEOUT_SECS`: receipt wait bound (default 120)
	/// - `DONATION_RECEIPT_POLL_MS`: first receipt poll interval (default 2000)
	/// - `DONATION_SYNC_CONCURRENCY`: parallel record fetches (default 8)
	/// - `DONATION_REQUEST_TIMEOUT_SECS`: per-request timeout (default 30)
	pub fn from_env() -> Result<Self, ConfigError> {
		let mut config = Self::default();

		if let Ok(url) = env::var("DONATION_RPC_URL") {
			config.rpc_url = url;
		}
		config.ws_url = env::var("DONATION_WS_URL").ok().filter(|url| !url.is_empty());

		if let Some(raw) = read_var("DONATION_CONTRACT_ADDRESS") {
			let address = Address::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
				var: "DONATION_CONTRACT_ADDRESS",
				reason: e.to_string(),
			})?;
			config.contract_address = Some(address);
		}
		if let Some(id) = parse_var::<u64>("DONATION_REQUIRED_CHAIN_ID")? {
			config.required_network = NetworkId(id);
		}
		if let Some(secs) = parse_var::<u64>("DONATION_CONFIRMATION_TIMEOUT_SECS")? {
			config.confirmation_timeout = Duration::from_secs(secs);
		}
		if let Some(ms) = parse_var::<u64>("DONATION_RECEIPT_POLL_MS")? {
			config.receipt_poll_interval = Duration::from_millis(ms);
		}
		if let Some(n) = parse_var::<usize>("DONATION_SYNC_CONCURRENCY")? {
			config.sync_concurrency = n.max(1);
		}
		if let Some(secs) = parse_var::<u64>("DONATION_REQUEST_TIMEOUT_SECS")? {
			config.request_timeout = Duration::from_secs(secs);
		}

		info!(
			"Session config: rpc={}, required network={}, contract={}",
			config.rpc_url,
			config.required_network,
			config
				.contract_address
				.map(|a| a.to_string())
				.unwrap_or_else(|| "unset".to_string())
		);
		Ok(config)
	}
}

fn read_var(var: &'static str) -> Option<String> {
	env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	read_var(var)
		.map(|raw| {
			raw.trim()
				.parse::<T>()
				.map_err(|e| ConfigError::InvalidValue {
					var,
					reason: e.to_string(),
				})
		})
		.transpose()
}
