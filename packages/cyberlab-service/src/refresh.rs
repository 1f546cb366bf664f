use std::{sync::Arc, time::Duration};

use tokio::{
	sync::broadcast::error::RecvError,
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};

use crate::CatalogService;
use cyberlab_storage::overlay;

/// Background refresh loops. Dropping the handle aborts every loop.
pub struct RefreshTasks {
	handles: Vec<JoinHandle<()>>,
}
impl RefreshTasks {
	/// Starts the statistics and catalog timers, the overlay watcher, and the admin signal
	/// follower. The first tick of each timer fires immediately.
	pub fn spawn(service: Arc<CatalogService>) -> Self {
		let stats_every = Duration::from_secs(service.cfg.refresh.stats_interval_seconds);
		let records_every = Duration::from_secs(service.cfg.refresh.records_interval_seconds);
		let handles = vec![
			tokio::spawn(stats_loop(service.clone(), stats_every)),
			tokio::spawn(records_loop(service.clone(), records_every)),
			tokio::spawn(overlay_loop(service.clone())),
			service.gate.clone().follow(&service.signal),
		];

		Self { handles }
	}

	pub fn abort(&self) {
		for handle in &self.handles {
			handle.abort();
		}
	}
}
impl Drop for RefreshTasks {
	fn drop(&mut self) {
		self.abort();
	}
}

async fn stats_loop(service: Arc<CatalogService>, every: Duration) {
	let mut ticker = time::interval(every);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;
		tracing::debug!("Refreshing stats.");
		service.refresh_stats().await;
	}
}

async fn records_loop(service: Arc<CatalogService>, every: Duration) {
	let mut ticker = time::interval(every);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;
		tracing::debug!("Refreshing catalog.");
		service.load_catalog().await;
	}
}

async fn overlay_loop(service: Arc<CatalogService>) {
	let mut changes = service.store.subscribe();

	loop {
		match changes.recv().await {
			Ok(change) if change.key == overlay::OVERLAY_KEY => {
				tracing::debug!("Overlay changed. Re-aggregating.");
				service.load_catalog().await;
			},
			Ok(_) => {},
			Err(RecvError::Lagged(skipped)) => {
				tracing::debug!(skipped, "Storage change feed lagged. Re-aggregating.");
				service.load_catalog().await;
			},
			Err(RecvError::Closed) => break,
		}
	}
}
