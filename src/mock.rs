//! In-memory wallet and ledger.
//!
//! [`MockLedger`] plays both the wallet provider and the donation contract, with switches to
//! simulate refusals, outages, reverts and stuck confirmations. Clones share state, so a test can
//! keep a handle while the controller owns another.

use crate::error::SessionError;
use crate::gateway::{DonationRecord, LedgerGateway, Receipt, TransactionHandle};
use crate::rpc::{RpcError, TransactionRequest, USER_REJECTED_CODE, WalletEvent, WalletEventStream};
use crate::wallet::{NetworkId, WalletProvider};
use alloy_primitives::Address;
use chrono::Utc;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Gas charged for every mined donation
pub const MOCK_GAS_USED: u128 = 21_000;

struct PendingWrite {
	from: Address,
	recipient: Address,
	amount_wei: u128,
	message: String,
}

struct MockLedgerState {
	accounts: Vec<Address>,
	network: NetworkId,
	balances: HashMap<Address, u128>,
	donations: Vec<DonationRecord>,
	gas_price_wei: u128,
	provider_available: bool,
	reject_accounts: bool,
	fail_balance: bool,
	reject_writes: bool,
	revert_writes: bool,
	hang_confirmations: bool,
	fail_fetch_at: Option<u64>,
	confirmation_gate: Option<Arc<Notify>>,
	pending_writes: HashMap<String, PendingWrite>,
	tx_counter: u64,
	write_calls: usize,
	read_calls: usize,
	subscribers: Vec<UnboundedSender<WalletEvent>>,
}

/// Mock wallet and donation ledger for testing.
#[derive(Clone)]
pub struct MockLedger {
	inner: Arc<Mutex<MockLedgerState>>,
}

impl MockLedger {
	pub fn new(network: NetworkId) -> Self {
		Self {
			inner: Arc::new(Mutex::new(MockLedgerState {
				accounts: Vec::new(),
				network,
				balances: HashMap::new(),
				donations: Vec::new(),
				gas_price_wei: 0,
				provider_available: true,
				reject_accounts: false,
				fail_balance: false,
				reject_writes: false,
				revert_writes: false,
				hang_confirmations: false,
				fail_fetch_at: None,
				confirmation_gate: None,
				pending_writes: HashMap::new(),
				tx_counter: 0,
				write_calls: 0,
				read_calls: 0,
				subscribers: Vec::new(),
			})),
		}
	}

	/// Expose `account` with the given balance. The first account added is the active one.
	pub fn with_account(self, account: Address, balance_wei: u128) -> Self {
		{
			let mut state = self.state();
			state.accounts.push(account);
			state.balances.insert(account, balance_wei);
		}
		self
	}

	fn state(&self) -> MutexGuard<'_, MockLedgerState> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Accounts the wallet exposes from now on. Does not emit an event.
	pub fn set_accounts(&self, accounts: Vec<Address>) {
		self.state().accounts = accounts;
	}

	/// Chain the wallet reports from now on. Does not emit an event.
	pub fn set_network(&self, network: NetworkId) {
		self.state().network = network;
	}

	pub fn set_balance(&self, account: Address, balance_wei: u128) {
		self.state().balances.insert(account, balance_wei);
	}

	pub fn set_gas_price(&self, gas_price_wei: u128) {
		self.state().gas_price_wei = gas_price_wei;
	}

	pub fn set_provider_available(&self, available: bool) {
		self.state().provider_available = available;
	}

	pub fn reject_account_requests(&self, reject: bool) {
		self.state().reject_accounts = reject;
	}

	pub fn fail_balance(&self, fail: bool) {
		self.state().fail_balance = fail;
	}

	pub fn reject_writes(&self, reject: bool) {
		self.state().reject_writes = reject;
	}

	pub fn revert_writes(&self, revert: bool) {
		self.state().revert_writes = revert;
	}

	/// Never confirm submitted transactions
	pub fn hang_confirmations(&self, hang: bool) {
		self.state().hang_confirmations = hang;
	}

	/// Make the fetch of the record at `index` fail
	pub fn fail_fetch_at(&self, index: Option<u64>) {
		self.state().fail_fetch_at = index;
	}

	/// Hold confirmations until [`resume_confirmations`](Self::resume_confirmations).
	pub fn pause_confirmations(&self) {
		self.state().confirmation_gate = Some(Arc::new(Notify::new()));
	}

	pub fn resume_confirmations(&self) {
		if let Some(gate) = self.state().confirmation_gate.take() {
			gate.notify_one();
		}
	}

	/// Append a record directly, as if mined by someone else.
	pub fn seed_donation(&self, donor: Address, recipient: Address, amount_wei: u128, message: &str) {
		let mut state = self.state();
		let index = state.donations.len() as u64;
		state.donations.push(DonationRecord {
			index,
			donor,
			recipient,
			amount_wei,
			timestamp: Utc::now(),
			message: message.to_string(),
		});
	}

	/// Push a wallet notification to every subscriber.
	pub fn emit(&self, event: WalletEvent) {
		self.state()
			.subscribers
			.retain(|subscriber| subscriber.unbounded_send(event.clone()).is_ok());
	}

	pub fn donation_records(&self) -> Vec<DonationRecord> {
		self.state().donations.clone()
	}

	pub fn balance_of(&self, account: Address) -> u128 {
		self.state().balances.get(&account).copied().unwrap_or_default()
	}

	/// Number of `submit_donation` calls
	pub fn write_calls(&self) -> usize {
		self.state().write_calls
	}

	/// Number of balance and ledger reads
	pub fn read_calls(&self) -> usize {
		self.state().read_calls
	}

	fn check_available(state: &MockLedgerState) -> Result<(), RpcError> {
		if state.provider_available {
			Ok(())
		} else {
			Err(RpcError::ConnectionError("Mock provider unavailable".to_string()))
		}
	}
}

#[async_trait::async_trait]
impl WalletProvider for MockLedger {
	async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
		let state = self.state();
		Self::check_available(&state)?;
		if state.reject_accounts {
			return Err(RpcError::Rpc {
				code: USER_REJECTED_CODE,
				message: "User rejected the request".to_string(),
			});
		}
		Ok(state.accounts.clone())
	}

	async fn chain_id(&self) -> Result<u64, RpcError> {
		let state = self.state();
		Self::check_available(&state)?;
		Ok(state.network.0)
	}

	async fn balance(&self, account: Address) -> Result<u128, RpcError> {
		let mut state = self.state();
		Self::check_available(&state)?;
		state.read_calls += 1;
		if state.fail_balance {
			return Err(RpcError::ConnectionError("Mock balance failure".to_string()));
		}
		Ok(state.balances.get(&account).copied().unwrap_or_default())
	}

	async fn send_transaction(&self, _tx: &TransactionRequest) -> Result<String, RpcError> {
		Err(RpcError::Rpc {
			code: -32601,
			message: "Mock wallet only sends donations through the ledger".to_string(),
		})
	}

	async fn subscribe_events(&self) -> Result<WalletEventStream, RpcError> {
		let (sender, receiver) = unbounded();
		self.state().subscribers.push(sender);
		Ok(Box::pin(receiver.map(Ok::<WalletEvent, RpcError>)))
	}

	fn name(&self) -> &'static str {
		"mock"
	}
}

#[async_trait::async_trait]
impl LedgerGateway for MockLedger {
	async fn donation_count(&self) -> Result<u64, SessionError> {
		let mut state = self.state();
		Self::check_available(&state).map_err(|e| SessionError::GatewayUnreachable(e.to_string()))?;
		state.read_calls += 1;
		Ok(state.donations.len() as u64)
	}

	async fn donation_at(&self, index: u64) -> Result<DonationRecord, SessionError> {
		let mut state = self.state();
		Self::check_available(&state).map_err(|e| SessionError::GatewayUnreachable(e.to_string()))?;
		state.read_calls += 1;
		if state.fail_fetch_at == Some(index) {
			return Err(SessionError::GatewayUnreachable(format!(
				"Mock failure fetching donation {}",
				index
			)));
		}
		usize::try_from(index)
			.ok()
			.and_then(|i| state.donations.get(i))
			.cloned()
			.ok_or(SessionError::IndexOutOfRange { index })
	}

	async fn submit_donation(
		&self,
		from: Address,
		recipient: Address,
		amount_wei: u128,
		message: &str,
	) -> Result<TransactionHandle, SessionError> {
		let mut state = self.state();
		state.write_calls += 1;
		Self::check_available(&state).map_err(|e| SessionError::GatewayUnreachable(e.to_string()))?;
		if state.reject_writes {
			return Err(SessionError::WriteRejected(
				"User denied transaction signature".to_string(),
			));
		}

		state.tx_counter += 1;
		let tx_hash = format!("0x{:064x}", state.tx_counter);
		state.pending_writes.insert(
			tx_hash.clone(),
			PendingWrite {
				from,
				recipient,
				amount_wei,
				message: message.to_string(),
			},
		);
		Ok(TransactionHandle {
			tx_hash,
			from,
			submitted_at: Utc::now(),
		})
	}

	async fn await_confirmation(&self, handle: &TransactionHandle) -> Result<Receipt, SessionError> {
		let (hang, gate) = {
			let state = self.state();
			(state.hang_confirmations, state.confirmation_gate.clone())
		};
		if hang {
			std::future::pending::<()>().await;
		}
		if let Some(gate) = gate {
			gate.notified().await;
		}

		let mut guard = self.state();
		let state = &mut *guard;
		let write = state.pending_writes.remove(&handle.tx_hash).ok_or_else(|| {
			SessionError::GatewayUnreachable(format!("Unknown transaction {}", handle.tx_hash))
		})?;
		let fee = MOCK_GAS_USED.saturating_mul(state.gas_price_wei);

		let sender = state.balances.entry(write.from).or_default();
		*sender = sender.saturating_sub(fee);
		if state.revert_writes {
			return Err(SessionError::TransactionReverted {
				tx_hash: handle.tx_hash.clone(),
			});
		}
		*sender = sender.saturating_sub(write.amount_wei);
		*state.balances.entry(write.recipient).or_default() += write.amount_wei;

		let index = state.donations.len() as u64;
		state.donations.push(DonationRecord {
			index,
			donor: write.from,
			recipient: write.recipient,
			amount_wei: write.amount_wei,
			timestamp: Utc::now(),
			message: write.message,
		});
		state.tx_counter += 1;
		Ok(Receipt {
			tx_hash: handle.tx_hash.clone(),
			block_number: Some(state.tx_counter),
			gas_used: MOCK_GAS_USED,
			effective_gas_price: state.gas_price_wei,
		})
	}
}
