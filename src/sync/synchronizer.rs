use crate::error::SessionError;
use crate::gateway::{DonationRecord, LedgerGateway};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Interval (in records) between progress log lines
const PROGRESS_LOG_INTERVAL: u64 = 50;

pub struct DonationSynchronizer {
	gateway: Arc<dyn LedgerGateway>,
	/// Record fetches in flight at once
	concurrency: usize,
}

impl DonationSynchronizer {
	pub fn new(gateway: Arc<dyn LedgerGateway>, concurrency: usize) -> Self {
		Self {
			gateway,
			concurrency: concurrency.max(1),
		}
	}

	/// Fetch every record in the ledger, newest first.
	///
	/// Records are fetched concurrently but collected in index order, then reversed, so the
	/// result is `[n-1, ..., 1, 0]` regardless of completion order.
	///
	/// # Errors
	/// The first failing fetch aborts the whole synchronization; no partial list is returned.
	pub async fn synchronize(&self) -> Result<Vec<DonationRecord>, SessionError> {
		let started = Instant::now();
		let count = self.gateway.donation_count().await?;
		debug!("Ledger holds {} donations", count);

		let gateway = self.gateway.clone();
		let mut records: Vec<DonationRecord> = stream::iter(0..count)
			.map(|index| {
				let gateway = gateway.clone();
				async move {
					let record = gateway.donation_at(index).await?;
					if index > 0 && index % PROGRESS_LOG_INTERVAL == 0 {
						debug!("Fetched donation {}/{}", index, count);
					}
					Ok::<_, SessionError>(record)
				}
			})
			.buffered(self.concurrency)
			.try_collect()
			.await?;

		records.reverse();
		info!(
			"Synchronized {} donations in {:?}",
			records.len(),
			started.elapsed()
		);
		Ok(records)
	}
}
