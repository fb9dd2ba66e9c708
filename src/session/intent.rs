use crate::transaction::DonationDraft;

/// User intent delivered to the controller from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIntent {
	Connect,
	Donate(DonationDraft),
	Refresh,
	/// Replace the draft being edited
	UpdateDraft(DonationDraft),
	CancelDraft,
}

impl SessionIntent {
	/// Intents that only touch local state and can be applied in arrival order
	pub fn is_local(&self) -> bool {
		matches!(self, SessionIntent::UpdateDraft(_) | SessionIntent::CancelDraft)
	}

	pub fn name(&self) -> &'static str {
		match self {
			SessionIntent::Connect => "connect",
			SessionIntent::Donate(_) => "donate",
			SessionIntent::Refresh => "refresh",
			SessionIntent::UpdateDraft(_) => "update-draft",
			SessionIntent::CancelDraft => "cancel-draft",
		}
	}
}
