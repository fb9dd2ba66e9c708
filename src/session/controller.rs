use super::intent::SessionIntent;
use super::state::{PendingDonation, SessionState};
use super::view::{DisplayOptions, SessionView};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::gateway::{DonationContractGateway, LedgerGateway, Receipt};
use crate::rpc::{JsonRpcClient, RpcError, WalletEvent, WalletEventStream};
use crate::sync::DonationSynchronizer;
use crate::transaction::{DonationDraft, TransactionOrchestrator};
use crate::wallet::{AccountChange, WalletProvider, WalletSession};
use alloy_primitives::Address;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Coordinates wallet, ledger and transactions for one user session.
///
/// At most one command runs at a time; a second one fails fast with
/// `OperationInProgress`. Wallet events are applied immediately and bump the session
/// generation, so results of commands started before the event are dropped.
#[derive(Clone)]
pub struct SessionController {
	state: Arc<RwLock<SessionState>>,
	/// Held for the whole duration of a command
	command_lock: Arc<Mutex<()>>,
	wallet: Arc<WalletSession>,
	synchronizer: Arc<DonationSynchronizer>,
	orchestrator: Arc<TransactionOrchestrator>,
	display: Arc<DisplayOptions>,
	views: Arc<watch::Sender<SessionView>>,
}

impl SessionController {
	pub fn new(
		config: &SessionConfig,
		provider: Arc<dyn WalletProvider>,
		gateway: Arc<dyn LedgerGateway>,
	) -> Self {
		let wallet = Arc::new(WalletSession::new(provider, config.required_network));
		let synchronizer = Arc::new(DonationSynchronizer::new(
			gateway.clone(),
			config.sync_concurrency,
		));
		let orchestrator = Arc::new(TransactionOrchestrator::new(
			gateway,
			wallet.clone(),
			synchronizer.clone(),
			config.confirmation_timeout,
		));
		let display = DisplayOptions::from(config);
		let (views, _) = watch::channel(SessionView::project(&SessionState::default(), &display));

		Self {
			state: Arc::new(RwLock::new(SessionState::default())),
			command_lock: Arc::new(Mutex::new(())),
			wallet,
			synchronizer,
			orchestrator,
			display: Arc::new(display),
			views: Arc::new(views),
		}
	}

	/// Controller backed by the JSON-RPC wallet endpoint and the deployed donation contract.
	pub fn with_rpc(config: &SessionConfig) -> Result<Self, RpcError> {
		let client = JsonRpcClient::new(
			config.rpc_url.clone(),
			config.ws_url.clone(),
			config.request_timeout,
		)?;
		let provider: Arc<dyn WalletProvider> = Arc::new(client.clone());
		let gateway = Arc::new(DonationContractGateway::from_config(
			client,
			provider.clone(),
			config,
		));
		Ok(Self::new(config, provider, gateway))
	}

	pub async fn current_view(&self) -> SessionView {
		let state = self.state.read().await;
		SessionView::project(&state, &self.display)
	}

	/// Receiver that observes every republished view
	pub fn subscribe(&self) -> watch::Receiver<SessionView> {
		self.views.subscribe()
	}

	/// Copy of the raw session state
	pub async fn snapshot(&self) -> SessionState {
		self.state.read().await.clone()
	}

	fn publish(&self, state: &SessionState) {
		self.views
			.send_replace(SessionView::project(state, &self.display));
	}

	/// Connect the wallet, check its network and load the ledger.
	///
	/// On the wrong network the session stays connected, but no ledger read is made and
	/// `WrongNetwork` is returned. A failed ledger load does not fail the connect; the
	/// previous snapshot is kept and marked stale.
	pub async fn connect(&self) -> Result<Address, SessionError> {
		let _guard = self.begin_command().await?;
		let generation = {
			let mut state = self.state.write().await;
			self.mark_connecting(&mut state);
			state.generation
		};
		self.run_connect(generation).await
	}

	/// Validate and send a donation, then refresh the ledger and balance.
	///
	/// The draft is kept on every failure and cleared on success. If a wallet event supersedes
	/// the session while the transaction is in flight, the receipt is still returned but the
	/// refreshed data is dropped.
	pub async fn donate(&self, draft: DonationDraft) -> Result<Receipt, SessionError> {
		let _guard = self.begin_command().await?;

		let (generation, wallet) = {
			let mut state = self.state.write().await;
			state.draft = Some(draft.clone());
			(state.generation, state.wallet.clone())
		};

		let request = match self.orchestrator.prepare(&draft, &wallet) {
			Ok(request) => request,
			Err(e) => {
				debug!("Donation not sent: {}", e);
				let mut state = self.state.write().await;
				state.record_error(&e);
				self.publish(&state);
				return Err(e);
			}
		};

		{
			let mut state = self.state.write().await;
			if !state.is_current(generation) {
				return Err(SessionError::NotConnected);
			}
			state.pending = Some(PendingDonation::from(&request));
			state.last_error = None;
			self.publish(&state);
		}
		info!(
			"Sending donation of {} wei to {}",
			request.amount_wei, request.recipient
		);

		let result = self.orchestrator.execute(&request, &wallet).await;

		let mut state = self.state.write().await;
		if !state.is_current(generation) {
			warn!("Session changed while donation was in flight; discarding its result");
			if result.is_ok() && state.draft.as_ref() == Some(&draft) {
				state.draft = None;
				self.publish(&state);
			}
			return result.map(|outcome| outcome.receipt);
		}
		state.pending = None;
		match result {
			Ok(outcome) => {
				state.draft = None;
				let stale = outcome.is_stale();
				if let Some(records) = outcome.ledger {
					state.replace_ledger(records);
				}
				if let Some(balance) = outcome.balance_wei {
					state.wallet.balance_wei = Some(balance);
				}
				state.stale = stale;
				self.publish(&state);
				Ok(outcome.receipt)
			}
			Err(e) => {
				warn!("Donation failed: {}", e);
				state.record_error(&e);
				self.publish(&state);
				Err(e)
			}
		}
	}

	/// Reload the ledger and the balance.
	pub async fn refresh(&self) -> Result<(), SessionError> {
		let _guard = self.begin_command().await?;

		let (generation, wallet) = {
			let mut state = self.state.write().await;
			if !state.wallet.is_connected() {
				return Err(SessionError::NotConnected);
			}
			if let Err(e) = self.wallet.check_network(state.wallet.network) {
				state.record_error(&e);
				self.publish(&state);
				return Err(e);
			}
			state.syncing = true;
			state.last_error = None;
			self.publish(&state);
			(state.generation, state.wallet.clone())
		};

		let ledger = self.synchronize_ledger(generation).await;
		let balance = self.wallet.refresh_balance(&wallet).await;

		let mut state = self.state.write().await;
		if !state.is_current(generation) {
			return ledger;
		}
		let balance = match balance {
			Ok(balance) => {
				state.wallet.balance_wei = balance;
				Ok(())
			}
			Err(e) => {
				warn!("Balance refresh failed: {}", e);
				state.record_error(&e);
				Err(e)
			}
		};
		self.publish(&state);
		ledger.and(balance)
	}

	pub async fn update_draft(&self, draft: DonationDraft) {
		let mut state = self.state.write().await;
		state.draft = Some(draft);
		if state.last_error.as_ref().is_some_and(|e| e.field.is_some()) {
			state.last_error = None;
		}
		self.publish(&state);
	}

	pub async fn cancel_draft(&self) {
		let mut state = self.state.write().await;
		state.draft = None;
		if state.last_error.as_ref().is_some_and(|e| e.field.is_some()) {
			state.last_error = None;
		}
		self.publish(&state);
	}

	async fn begin_command(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, SessionError> {
		match self.command_lock.try_lock() {
			Ok(guard) => Ok(guard),
			Err(_) => {
				debug!("Rejecting command, another one is in progress");
				let mut state = self.state.write().await;
				if state.last_error.as_ref().is_none_or(|e| e.field.is_none()) {
					state.record_error(&SessionError::OperationInProgress);
					self.publish(&state);
				}
				Err(SessionError::OperationInProgress)
			}
		}
	}

	fn mark_connecting(&self, state: &mut SessionState) {
		state.wallet.begin_connect();
		state.last_error = None;
		self.publish(state);
	}

	/// Connect flow for `generation`. The caller holds the command lock and has already
	/// marked the session as connecting.
	async fn run_connect(&self, generation: u64) -> Result<Address, SessionError> {
		let connection = match self.wallet.connect().await {
			Ok(connection) => connection,
			Err(e) => {
				warn!("Wallet connection failed: {}", e);
				let mut state = self.state.write().await;
				if state.is_current(generation) {
					state.clear_connection();
					state.record_error(&e);
					self.publish(&state);
				}
				return Err(e);
			}
		};

		let network_check = self.wallet.check_network(Some(connection.network));
		{
			let mut state = self.state.write().await;
			if !state.is_current(generation) {
				debug!("Discarding connection result for a superseded session");
				return Err(SessionError::NotConnected);
			}
			state.wallet.apply_connection(&connection);
			match &network_check {
				Ok(()) => state.syncing = true,
				Err(e) => state.record_error(e),
			}
			self.publish(&state);
		}
		if let Err(e) = network_check {
			warn!("{}", e);
			return Err(e);
		}

		// The connection stands even if the ledger cannot be loaded
		let _ = self.synchronize_ledger(generation).await;
		Ok(connection.account)
	}

	/// Load a fresh snapshot and apply it if the session is still current.
	async fn synchronize_ledger(&self, generation: u64) -> Result<(), SessionError> {
		let result = self.synchronizer.synchronize().await;

		let mut state = self.state.write().await;
		if !state.is_current(generation) {
			debug!("Discarding ledger snapshot for a superseded session");
			return result.map(|_| ());
		}
		state.syncing = false;
		let outcome = match result {
			Ok(records) => {
				state.replace_ledger(records);
				Ok(())
			}
			Err(e) => {
				warn!("Ledger synchronization failed, keeping previous snapshot: {}", e);
				state.stale = true;
				state.record_error(&e);
				Err(e)
			}
		};
		self.publish(&state);
		outcome
	}

	/// Apply a wallet notification to the session state.
	///
	/// Returns the new generation when the session has to be re-established.
	pub async fn apply_wallet_event(&self, event: &WalletEvent) -> Option<u64> {
		let mut state = self.state.write().await;
		let reconnect = match event {
			WalletEvent::AccountsChanged(accounts) => {
				match self.wallet.accounts_changed(&mut state.wallet, accounts) {
					AccountChange::Revoked => {
						state.supersede();
						state.clear_connection();
						None
					}
					AccountChange::Switched(_) => Some(state.supersede()),
					AccountChange::Unchanged => None,
				}
			}
			WalletEvent::ChainChanged(network) => {
				if self.wallet.chain_changed(&mut state.wallet, *network) {
					Some(state.supersede())
				} else {
					None
				}
			}
		};
		self.publish(&state);
		reconnect
	}

	/// Re-run the connect flow for `generation`, waiting for any in-flight command first.
	/// Does nothing if a newer event superseded `generation` meanwhile.
	pub async fn reconnect(&self, generation: u64) -> Result<(), SessionError> {
		let _guard = self.command_lock.lock().await;
		{
			let mut state = self.state.write().await;
			if !state.is_current(generation) {
				debug!("Reconnect for generation {} superseded", generation);
				return Ok(());
			}
			self.mark_connecting(&mut state);
		}
		info!("Re-establishing session after wallet change");
		self.run_connect(generation).await.map(|_| ())
	}

	/// Apply a wallet notification and wait for the resulting reconnect, if any.
	pub async fn handle_wallet_event(&self, event: WalletEvent) -> Result<(), SessionError> {
		match self.apply_wallet_event(&event).await {
			Some(generation) => self.reconnect(generation).await,
			None => Ok(()),
		}
	}

	/// Consume a stream of wallet notifications in the background.
	///
	/// Events are applied in arrival order; reconnects run in their own tasks so a slow
	/// reconnect never delays the next event.
	pub fn spawn_event_listener(&self, mut events: WalletEventStream) -> JoinHandle<()> {
		let controller = self.clone();
		tokio::spawn(async move {
			while let Some(item) = events.next().await {
				match item {
					Ok(event) => {
						debug!("Wallet event: {:?}", event);
						if let Some(generation) = controller.apply_wallet_event(&event).await {
							let controller = controller.clone();
							tokio::spawn(async move {
								if let Err(e) = controller.reconnect(generation).await {
									warn!("Reconnect failed: {}", e);
								}
							});
						}
					}
					Err(e) => error!("Error in wallet event stream: {}", e),
				}
			}
			info!("Wallet event stream ended");
		})
	}

	/// Subscribe to the provider's notifications and start listening.
	pub async fn listen_for_wallet_events(&self) -> Result<JoinHandle<()>, SessionError> {
		let events = self
			.wallet
			.provider()
			.subscribe_events()
			.await
			.map_err(|e| SessionError::ProviderUnavailable(e.to_string()))?;
		Ok(self.spawn_event_listener(events))
	}

	/// Run one user intent to completion.
	pub async fn handle_intent(&self, intent: SessionIntent) -> Result<(), SessionError> {
		match intent {
			SessionIntent::Connect => self.connect().await.map(|_| ()),
			SessionIntent::Donate(draft) => self.donate(draft).await.map(|_| ()),
			SessionIntent::Refresh => self.refresh().await,
			SessionIntent::UpdateDraft(draft) => {
				self.update_draft(draft).await;
				Ok(())
			}
			SessionIntent::CancelDraft => {
				self.cancel_draft().await;
				Ok(())
			}
		}
	}

	/// Consume intents in the background.
	///
	/// Draft edits are applied in order on the loop itself; commands run in their own tasks,
	/// so one arriving while another runs is rejected with `OperationInProgress` instead of
	/// queueing up.
	pub fn spawn_intent_loop(&self, mut intents: mpsc::Receiver<SessionIntent>) -> JoinHandle<()> {
		let controller = self.clone();
		tokio::spawn(async move {
			while let Some(intent) = intents.recv().await {
				let name = intent.name();
				if intent.is_local() {
					let _ = controller.handle_intent(intent).await;
					continue;
				}
				let controller = controller.clone();
				tokio::spawn(async move {
					if let Err(e) = controller.handle_intent(intent).await {
						debug!("Intent {} failed: {}", name, e);
					}
				});
			}
			debug!("Intent channel closed");
		})
	}
}
