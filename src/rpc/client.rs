//!
//! JSON-RPC client for the wallet provider endpoint.
//!
//! Requests go over HTTP with an incrementing request id. Wallet notifications
//! (`accountsChanged`, `chainChanged`) are delivered over a WebSocket subscription.
//! All methods are async and designed for use with Tokio.

use super::types::*;
use crate::wallet::NetworkId;
use alloy_primitives::Address;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_tungstenite::{
	connect_async,
	tungstenite::{Message, client::IntoClientRequest},
};
use tracing::{debug, error, info};

/// JSON-RPC client for a wallet endpoint
#[derive(Clone)]
pub struct JsonRpcClient {
	/// The underlying HTTP client for requests.
	http_client: Client,
	/// HTTP endpoint for JSON-RPC calls.
	rpc_url: String,
	/// WebSocket endpoint for wallet notifications, if the provider offers one.
	ws_url: Option<String>,
	next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
	/// Create a new client.
	///
	/// # Arguments
	/// * `rpc_url` - The HTTP endpoint for JSON-RPC calls.
	/// * `ws_url` - The WebSocket endpoint for subscriptions.
	/// * `request_timeout` - Timeout applied to every HTTP request.
	pub fn new(
		rpc_url: String,
		ws_url: Option<String>,
		request_timeout: Duration,
	) -> Result<Self, RpcError> {
		let http_client = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			ws_url,
			next_id: Arc::new(AtomicU64::new(1)),
		})
	}

	/// Execute a JSON-RPC call and deserialize its result.
	///
	/// A `null` result is only accepted when `T` can represent it, e.g. `Option<_>`.
	///
	/// # Errors
	/// Returns `RpcError::Rpc` when the endpoint answers with an error object.
	pub async fn request<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, RpcError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("RPC request #{}: {}", id, method);

		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(RpcError::ConnectionError(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let response: JsonRpcResponse = response.json().await?;

		if let Some(error) = response.error {
			debug!("RPC request #{} failed: {} {}", id, error.code, error.message);
			return Err(RpcError::Rpc {
				code: error.code,
				message: error.message,
			});
		}

		Ok(serde_json::from_value(response.result)?)
	}

	/// Subscribe to wallet account and chain notifications.
	///
	/// # Returns
	/// A pinned async stream of `WalletEvent` results. Each item is either a wallet event or an error.
	///
	/// # Errors
	/// Returns `RpcError` if no WebSocket endpoint is configured or the subscription handshake fails.
	pub async fn subscribe_wallet_events(&self) -> Result<WalletEventStream, RpcError> {
		let ws_url = self.ws_url.as_ref().ok_or_else(|| {
			RpcError::SubscriptionError("No WebSocket endpoint configured".to_string())
		})?;
		debug!("Attempting WebSocket connection to: {}", ws_url);

		let request = ws_url.as_str().into_client_request()?;
		let (ws_stream, response) = connect_async(request).await?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);
		let (mut ws_sender, mut ws_receiver) = ws_stream.split();

		let topics = [
			(1u64, SubscriptionTopic::AccountsChanged),
			(2u64, SubscriptionTopic::ChainChanged),
		];
		for (id, topic) in topics {
			let subscribe = json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": "eth_subscribe",
				"params": [topic.as_str()],
			});
			ws_sender.send(Message::Text(subscribe.to_string())).await?;
		}

		// Wait for both subscription ids
		let mut subscriptions: HashMap<String, SubscriptionTopic> = HashMap::new();
		while subscriptions.len() < topics.len() {
			let Some(msg) = ws_receiver.next().await else {
				return Err(RpcError::SubscriptionError(
					"Connection closed during handshake".to_string(),
				));
			};
			match msg? {
				Message::Text(text) => {
					let response: JsonRpcResponse = serde_json::from_str(&text)?;
					if let Some(error) = response.error {
						return Err(RpcError::Rpc {
							code: error.code,
							message: error.message,
						});
					}
					let request_id = response.id.as_ref().and_then(|id| id.as_u64());
					let Some((_, topic)) = topics.iter().find(|(id, _)| Some(*id) == request_id)
					else {
						debug!("Ignoring message during handshake: {}", text);
						continue;
					};
					let subscription = response.result.as_str().ok_or(RpcError::NoData)?;
					info!("Subscribed to {} ({})", topic.as_str(), subscription);
					subscriptions.insert(subscription.to_string(), *topic);
				}
				Message::Ping(_) | Message::Pong(_) => continue,
				_ => {
					return Err(RpcError::SubscriptionError(
						"Unexpected message type during handshake".to_string(),
					));
				}
			}
		}

		let subscriptions = Arc::new(subscriptions);
		let stream = ws_receiver.filter_map(move |msg| {
			let subscriptions = subscriptions.clone();
			async move {
				match msg {
					Ok(Message::Text(text)) => decode_notification(&text, &subscriptions),
					Ok(Message::Close(_)) => {
						info!("WebSocket connection closed");
						None
					}
					Ok(_) => None,
					Err(e) => {
						error!("WebSocket error: {}", e);
						Some(Err(RpcError::WebSocketError(e)))
					}
				}
			}
		});

		Ok(Box::pin(stream))
	}
}

/// Decode one subscription push message. Returns `None` for messages that are not wallet
/// notifications.
pub(crate) fn decode_notification(
	text: &str,
	subscriptions: &HashMap<String, SubscriptionTopic>,
) -> Option<Result<WalletEvent, RpcError>> {
	let notification = match serde_json::from_str::<SubscriptionNotification>(text) {
		Ok(notification) if notification.method == "eth_subscription" => notification,
		Ok(_) | Err(_) => {
			debug!("Ignoring non-notification message: {}", text);
			return None;
		}
	};
	let Some(topic) = subscriptions.get(&notification.params.subscription) else {
		debug!(
			"Notification for unknown subscription {}",
			notification.params.subscription
		);
		return None;
	};

	let result = notification.params.result;
	let event = match topic {
		SubscriptionTopic::AccountsChanged => serde_json::from_value::<Vec<String>>(result)
			.map_err(RpcError::from)
			.and_then(|raw| {
				raw.iter()
					.map(|account| {
						Address::from_str(account).map_err(|e| {
							RpcError::InvalidResponse(format!("bad account {}: {}", account, e))
						})
					})
					.collect::<Result<Vec<_>, _>>()
			})
			.map(WalletEvent::AccountsChanged),
		SubscriptionTopic::ChainChanged => serde_json::from_value::<String>(result)
			.map_err(RpcError::from)
			.and_then(|raw| parse_quantity(&raw))
			.and_then(|id| {
				u64::try_from(id).map_err(|_| RpcError::InvalidQuantity(id.to_string()))
			})
			.map(|id| WalletEvent::ChainChanged(NetworkId(id))),
	};

	if let Err(e) = &event {
		error!("Failed to decode {} notification: {}", topic.as_str(), e);
	}
	Some(event)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn subscriptions() -> HashMap<String, SubscriptionTopic> {
		HashMap::from([
			("0xa1".to_string(), SubscriptionTopic::AccountsChanged),
			("0xc2".to_string(), SubscriptionTopic::ChainChanged),
		])
	}

	fn notification(subscription: &str, result: serde_json::Value) -> String {
		json!({
			"jsonrpc": "2.0",
			"method": "eth_subscription",
			"params": { "subscription": subscription, "result": result }
		})
		.to_string()
	}

	#[test]
	fn decodes_accounts_changed() {
		let text = notification(
			"0xa1",
			json!(["0x52908400098527886E0F7030069857D2E4169EE7"]),
		);
		let event = decode_notification(&text, &subscriptions()).unwrap().unwrap();
		let expected =
			Address::from_str("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
		assert_eq!(event, WalletEvent::AccountsChanged(vec![expected]));

		let revoked = decode_notification(&notification("0xa1", json!([])), &subscriptions());
		assert_eq!(revoked.unwrap().unwrap(), WalletEvent::AccountsChanged(vec![]));
	}

	#[test]
	fn decodes_chain_changed() {
		let text = notification("0xc2", json!("0x1"));
		let event = decode_notification(&text, &subscriptions()).unwrap().unwrap();
		assert_eq!(event, WalletEvent::ChainChanged(NetworkId(1)));
	}

	#[test]
	fn ignores_unrelated_messages() {
		let subs = subscriptions();
		assert!(decode_notification(r#"{"jsonrpc":"2.0","id":7,"result":"0x1"}"#, &subs).is_none());
		assert!(decode_notification(&notification("0xff", json!("0x1")), &subs).is_none());
		assert!(decode_notification("not json", &subs).is_none());
	}

	#[test]
	fn reports_malformed_payloads() {
		let text = notification("0xa1", json!(["not-an-address"]));
		assert!(decode_notification(&text, &subscriptions()).unwrap().is_err());
	}
}
