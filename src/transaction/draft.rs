use super::NATIVE_TOKEN_DECIMALS;
use crate::error::{DraftField, SessionError};
use crate::utils::{AmountError, parse_token_amount};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Donation as typed by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationDraft {
	pub recipient: String,
	/// Decimal amount in ETH, e.g. `"0.5"`
	pub amount: String,
	pub message: String,
}

/// A draft that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDonation {
	pub recipient: Address,
	pub amount_wei: u128,
	pub message: String,
}

impl DonationDraft {
	pub fn new(
		recipient: impl Into<String>,
		amount: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			recipient: recipient.into(),
			amount: amount.into(),
			message: message.into(),
		}
	}

	/// Validate the recipient first, then the amount. The message is free text.
	pub fn validate(&self) -> Result<ValidatedDonation, SessionError> {
		let recipient = parse_recipient(&self.recipient)?;
		let amount_wei = parse_amount(&self.amount)?;
		Ok(ValidatedDonation {
			recipient,
			amount_wei,
			message: self.message.clone(),
		})
	}

	/// Every validation problem of the draft, one per field.
	pub fn problems(&self) -> Vec<SessionError> {
		[
			parse_recipient(&self.recipient).err(),
			parse_amount(&self.amount).err(),
		]
		.into_iter()
		.flatten()
		.collect()
	}
}

/// Parse a 20-byte hex address. All-lowercase and all-uppercase input is accepted as is;
/// mixed case must carry a valid EIP-55 checksum.
pub fn parse_recipient(text: &str) -> Result<Address, SessionError> {
	let trimmed = text.trim();
	if trimmed.is_empty() {
		return Err(SessionError::validation(
			DraftField::Recipient,
			"Recipient address is required",
		));
	}
	let invalid = || SessionError::validation(DraftField::Recipient, "Invalid Ethereum address");

	let digits = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed);
	if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(invalid());
	}
	let address = Address::from_str(&format!("0x{}", digits)).map_err(|_| invalid())?;

	let mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
		&& digits.chars().any(|c| c.is_ascii_lowercase());
	if mixed_case && address.to_checksum(None)[2..] != *digits {
		return Err(SessionError::validation(
			DraftField::Recipient,
			"Invalid Ethereum address (bad checksum)",
		));
	}
	Ok(address)
}

fn parse_amount(text: &str) -> Result<u128, SessionError> {
	let invalid = |reason: &str| SessionError::validation(DraftField::Amount, reason);
	match parse_token_amount(text, NATIVE_TOKEN_DECIMALS) {
		Ok(0) => Err(invalid("Amount must be a positive number")),
		Ok(wei) => Ok(wei),
		Err(AmountError::Empty) => Err(invalid("Amount is required")),
		Err(AmountError::TooManyDecimals(max)) => Err(SessionError::validation(
			DraftField::Amount,
			format!("Amount supports at most {} decimal places", max),
		)),
		Err(AmountError::Overflow) => Err(invalid("Amount is too large")),
		Err(AmountError::Negative) | Err(AmountError::Invalid(_)) => {
			Err(invalid("Amount must be a positive number"))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const RECIPIENT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

	fn field_of(result: Result<ValidatedDonation, SessionError>) -> Option<DraftField> {
		result.err().and_then(|e| e.field())
	}

	#[test]
	fn valid_draft_converts_amount_to_wei() {
		let validated = DonationDraft::new(RECIPIENT, "0.5", "thanks").validate().unwrap();
		assert_eq!(validated.amount_wei, 500_000_000_000_000_000);
		assert_eq!(validated.recipient.to_checksum(None), RECIPIENT);
		assert_eq!(validated.message, "thanks");
	}

	#[test]
	fn zero_and_negative_amounts_are_rejected() {
		for amount in ["0", "0.0", "-1", "abc", ""] {
			let result = DonationDraft::new(RECIPIENT, amount, "").validate();
			assert_eq!(field_of(result), Some(DraftField::Amount), "amount {:?}", amount);
		}
	}

	#[test]
	fn too_precise_amount_is_rejected() {
		let result = DonationDraft::new(RECIPIENT, "0.0000000000000000001", "").validate();
		assert_eq!(field_of(result), Some(DraftField::Amount));
	}

	#[test]
	fn malformed_recipients_are_rejected() {
		for recipient in ["not-an-address", "", "0x1234", "0xZZ908400098527886E0F7030069857D2E4169EE7"] {
			let result = DonationDraft::new(recipient, "1", "").validate();
			assert_eq!(field_of(result), Some(DraftField::Recipient), "recipient {:?}", recipient);
		}
	}

	#[test]
	fn checksum_is_enforced_only_for_mixed_case() {
		assert!(parse_recipient(&RECIPIENT.to_lowercase()).is_ok());
		assert!(parse_recipient(&format!("0x{}", RECIPIENT[2..].to_uppercase())).is_ok());
		assert!(parse_recipient(RECIPIENT).is_ok());
		// Flip the case of one letter
		let broken = RECIPIENT.replacen('E', "e", 1);
		assert!(parse_recipient(&broken).is_err());
	}

	#[test]
	fn problems_reports_every_field() {
		let problems = DonationDraft::new("nope", "0", "").problems();
		let fields: Vec<_> = problems.iter().filter_map(|p| p.field()).collect();
		assert_eq!(fields, vec![DraftField::Recipient, DraftField::Amount]);
	}
}
