//! Donation ledger synchronization.
//!
//! Produces a full, newest-first snapshot of the ledger. A snapshot is all-or-nothing: if any
//! record fails to load, the caller keeps its previous snapshot.

mod synchronizer;

pub use synchronizer::DonationSynchronizer;
