//! Error taxonomy surfaced by the session controller and its components.
//!
//! Every component boundary classifies its lower-level failures (`RpcError`, `AmountError`)
//! into one of these variants, so presentation only ever has to deal with this enum.

use crate::wallet::NetworkId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Draft field a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftField {
	Recipient,
	Amount,
}

impl fmt::Display for DraftField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DraftField::Recipient => write!(f, "recipient"),
			DraftField::Amount => write!(f, "amount"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
	#[error("Wallet provider unavailable: {0}")]
	ProviderUnavailable(String),

	#[error("Request rejected by user: {0}")]
	UserRejected(String),

	#[error("Wrong network: expected {expected}, wallet is on {actual}")]
	WrongNetwork {
		expected: NetworkId,
		actual: NetworkId,
	},

	#[error("Wallet is not connected")]
	NotConnected,

	#[error("Invalid {field}: {reason}")]
	ValidationError { field: DraftField, reason: String },

	#[error("Ledger unreachable: {0}")]
	GatewayUnreachable(String),

	#[error("Donation index {index} is out of range")]
	IndexOutOfRange { index: u64 },

	#[error("Transaction rejected: {0}")]
	WriteRejected(String),

	#[error("Transaction {tx_hash} reverted")]
	TransactionReverted { tx_hash: String },

	#[error("Transaction {tx_hash} not confirmed after {}s", .waited.as_secs())]
	TransactionTimedOut { tx_hash: String, waited: Duration },

	#[error("Another operation is already in progress")]
	OperationInProgress,
}

impl SessionError {
	pub fn validation(field: DraftField, reason: impl Into<String>) -> Self {
		SessionError::ValidationError {
			field,
			reason: reason.into(),
		}
	}

	/// Draft field to highlight, if this is a validation failure
	pub fn field(&self) -> Option<DraftField> {
		match self {
			SessionError::ValidationError { field, .. } => Some(*field),
			_ => None,
		}
	}

	/// Network-level failures the user may retry by hand. Nothing is retried automatically.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			SessionError::GatewayUnreachable(_) | SessionError::ProviderUnavailable(_)
		)
	}
}

/// Presentation form of a [`SessionError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
	pub message: String,
	pub field: Option<DraftField>,
	pub retryable: bool,
}

impl From<&SessionError> for ErrorNotice {
	fn from(error: &SessionError) -> Self {
		let message = match error {
			SessionError::ValidationError { reason, .. } => reason.clone(),
			other => other.to_string(),
		};
		Self {
			message,
			field: error.field(),
			retryable: error.is_retryable(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation_notice_carries_field_and_plain_reason() {
		let error = SessionError::validation(DraftField::Amount, "Amount must be a positive number");
		let notice = ErrorNotice::from(&error);
		assert_eq!(notice.field, Some(DraftField::Amount));
		assert_eq!(notice.message, "Amount must be a positive number");
		assert!(!notice.retryable);
	}

	#[test]
	fn only_network_failures_are_retryable() {
		assert!(SessionError::GatewayUnreachable("timeout".into()).is_retryable());
		assert!(SessionError::ProviderUnavailable("no wallet".into()).is_retryable());
		assert!(!SessionError::WriteRejected("denied".into()).is_retryable());
		assert!(!SessionError::OperationInProgress.is_retryable());
	}

	#[test]
	fn timeout_message_reports_seconds() {
		let error = SessionError::TransactionTimedOut {
			tx_hash: "0xabc".into(),
			waited: Duration::from_secs(120),
		};
		assert_eq!(error.to_string(), "Transaction 0xabc not confirmed after 120s");
	}
}
