use clap::{Parser, Subcommand};
use donation_session::{DonationDraft, SessionConfig, SessionController, SessionView};
use std::str::FromStr;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "donation-session")]
#[command(about = "Connect a wallet, list on-chain donations and send one")]
struct Args {
	/// Wallet JSON-RPC endpoint (overrides DONATION_RPC_URL).
	#[arg(long)]
	rpc_url: Option<String>,

	/// WebSocket endpoint for account/chain notifications (overrides DONATION_WS_URL).
	#[arg(long)]
	ws_url: Option<String>,

	/// Donation contract address (overrides DONATION_CONTRACT_ADDRESS).
	#[arg(long)]
	contract: Option<String>,

	/// Chain id writes are allowed on (overrides DONATION_REQUIRED_CHAIN_ID).
	#[arg(long)]
	chain_id: Option<u64>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the session and the donation list (default)
	Show,
	/// Send a donation
	Donate {
		recipient: String,
		/// Amount in ETH, e.g. 0.5
		amount: String,
		#[arg(default_value = "")]
		message: String,
	},
	/// Keep running and print the session every time it changes
	Watch,
}

fn print_view(view: &SessionView) {
	match serde_json::to_string_pretty(view) {
		Ok(json) => println!("{}", json),
		Err(e) => error!("Failed to render session view: {}", e),
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let args = Args::parse();

	let mut config = match SessionConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};
	if let Some(rpc_url) = args.rpc_url {
		config.rpc_url = rpc_url;
	}
	if let Some(ws_url) = args.ws_url {
		config.ws_url = Some(ws_url);
	}
	if let Some(contract) = args.contract {
		match alloy_primitives::Address::from_str(contract.trim()) {
			Ok(address) => config.contract_address = Some(address),
			Err(e) => {
				error!("Invalid contract address {}: {}", contract, e);
				return;
			}
		}
	}
	if let Some(chain_id) = args.chain_id {
		config.required_network = donation_session::wallet::NetworkId(chain_id);
	}

	let controller = match SessionController::with_rpc(&config) {
		Ok(controller) => controller,
		Err(e) => {
			error!("Failed to create RPC client: {}", e);
			return;
		}
	};

	let listener = if config.ws_url.is_some() {
		match controller.listen_for_wallet_events().await {
			Ok(handle) => Some(handle),
			Err(e) => {
				warn!("Wallet notifications unavailable: {}", e);
				None
			}
		}
	} else {
		None
	};

	match controller.connect().await {
		Ok(account) => info!("Session established for {}", account),
		Err(e) => {
			error!("Failed to connect wallet: {}", e);
			print_view(&controller.current_view().await);
			return;
		}
	}

	match args.command.unwrap_or(Command::Show) {
		Command::Show => print_view(&controller.current_view().await),
		Command::Donate {
			recipient,
			amount,
			message,
		} => {
			match controller
				.donate(DonationDraft::new(recipient, amount, message))
				.await
			{
				Ok(receipt) => info!(
					"Donation confirmed: {} (fee {} wei)",
					receipt.tx_hash,
					receipt.fee_wei()
				),
				Err(e) => error!("Donation failed: {}", e),
			}
			print_view(&controller.current_view().await);
		}
		Command::Watch => {
			let mut views = controller.subscribe();
			print_view(&views.borrow_and_update().clone());
			while views.changed().await.is_ok() {
				let view = views.borrow_and_update().clone();
				print_view(&view);
			}
		}
	}

	if let Some(listener) = listener {
		listener.abort();
	}
}
