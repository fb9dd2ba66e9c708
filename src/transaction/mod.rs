/// Donation drafts and their validation
pub mod draft;
/// Submission, confirmation and post-confirmation refresh of donations
pub mod orchestrator;

pub use draft::{DonationDraft, ValidatedDonation, parse_recipient};
pub use orchestrator::{DonationOutcome, DonationRequest, TransactionOrchestrator};

/// Number of decimal places of the native token (ETH).
pub const NATIVE_TOKEN_DECIMALS: u32 = 18;
