//! Session and transaction controller for a donation dApp.
//!
//! Connects an EVM wallet, keeps a newest-first snapshot of an on-chain donation ledger and
//! sends donations through the wallet, republishing a presentation view after every change.

pub mod config;
pub mod error;
pub mod gateway;
pub mod rpc;
pub mod session;
pub mod sync;
pub mod transaction;
pub mod utils;
pub mod wallet;

/// In-memory wallet and ledger. Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use config::SessionConfig;
pub use error::{DraftField, ErrorNotice, SessionError};
pub use session::{SessionController, SessionIntent, SessionView};
pub use transaction::DonationDraft;
