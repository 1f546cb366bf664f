use std::{sync::Arc, time::Duration};

use tokio::time::{self, MissedTickBehavior};

use cyberlab_service::{CatalogService, RefreshTasks};
use cyberlab_storage::FileStore;

const RELOAD_EVERY: Duration = Duration::from_secs(2);

/// Runs the refresh loops and logs what changes until Ctrl-C.
///
/// The state file is polled so edits made by another process reach the overlay watcher.
pub async fn run(service: Arc<CatalogService>, store: Arc<FileStore>) -> color_eyre::Result<()> {
	let mut catalog = service.subscribe_catalog();
	let mut htb = service.subscribe_htb_stats();
	let mut thm = service.subscribe_thm_stats();
	let mut notices = service.notices.subscribe();
	let mut admin = service.gate.subscribe();
	let tasks = RefreshTasks::spawn(service.clone());
	let mut reload = time::interval(RELOAD_EVERY);

	reload.set_missed_tick_behavior(MissedTickBehavior::Skip);
	service.signal.publish();
	tracing::info!(path = %store.path().display(), "Watching catalog. Press Ctrl-C to stop.");

	loop {
		tokio::select! {
			result = tokio::signal::ctrl_c() => {
				result?;

				break;
			},
			_ = reload.tick() => {
				match store.reload() {
					Ok(changes) if !changes.is_empty() => {
						tracing::info!(changed = changes.len(), "State file changed on disk.");
					},
					Ok(_) => {},
					Err(err) => tracing::warn!(error = %err, "Failed to reload state file."),
				}
			},
			Ok(()) = catalog.changed() => {
				let current = catalog.borrow_and_update().clone();

				tracing::info!(
					records = current.records.len(),
					recent = current.recent.len(),
					primary = ?current.primary,
					advisory = current.advisory.as_deref().unwrap_or(""),
					"Catalog updated."
				);
			},
			Ok(()) = htb.changed() => {
				let stats = htb.borrow_and_update().clone();

				tracing::info!(
					machines_pwned = stats.machines_pwned,
					global_ranking = stats.global_ranking,
					final_score = stats.final_score,
					rank = %stats.htb_rank,
					"HTB stats updated."
				);
			},
			Ok(()) = thm.changed() => {
				let stats = thm.borrow_and_update().clone();

				tracing::info!(
					rank = %stats.thm_rank,
					rooms_completed = stats.rooms_completed,
					streak = stats.streak,
					"THM stats updated."
				);
			},
			Ok(()) = notices.changed() => {
				if let Some(notice) = notices.borrow_and_update().clone() {
					tracing::info!(kind = ?notice.kind, message = %notice.message, "Notice.");
				}
			},
			Ok(()) = admin.changed() => {
				let is_admin = *admin.borrow_and_update();

				tracing::info!(admin = is_admin, "Admin mode changed.");
			},
		}
	}

	drop(tasks);
	tracing::info!("Stopped watching.");

	Ok(())
}
