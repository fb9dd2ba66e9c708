//!
//! Utility module for the donation session.
//!
//! Re-exports amount and address formatting helpers used by the gateway, the orchestrator and
//! the view-model.
/// Amount parsing and display helpers
pub mod index;

pub use index::{
	AmountError, format_display_amount, format_token_amount, parse_token_amount, short_address,
};
