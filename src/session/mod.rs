//! Session controller: the single owner of session state.
//!
//! Commands (connect, donate, refresh) and wallet notifications are funneled through
//! [`SessionController`], which serializes them, discards results that a newer wallet event
//! has superseded and republishes a [`SessionView`] after every change.

mod controller;
mod intent;
mod state;
mod view;

pub use controller::SessionController;
pub use intent::SessionIntent;
pub use state::{PendingDonation, SessionState};
pub use view::{DisplayOptions, DonationView, PendingView, SessionView};
