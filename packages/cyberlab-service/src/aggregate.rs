//! Record aggregation: primary machines, secondary rooms, and the local overlay merged into one
//! canonical collection.

use ahash::AHashMap;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{CatalogService, bundled};
use cyberlab_domain::{Machine, Os, Platform, Record, recent};
use cyberlab_storage::overlay;

pub const RECORDS_CACHE_KEY: &str = "htb_machines_cache";
pub const FALLBACK_ADVISORY: &str = "Using cached data - database temporarily unavailable";

/// Where the primary machines of an aggregation came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimarySource {
	/// Cache entry still inside its freshness window.
	Cache,
	Remote,
	/// Expired cache entry, used because the store could not be read.
	StaleCache,
	Bundled,
	#[default]
	Unavailable,
}
impl PrimarySource {
	pub fn is_fallback(self) -> bool {
		matches!(self, Self::StaleCache | Self::Bundled | Self::Unavailable)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
	pub records: Vec<Record>,
	pub recent: Vec<Record>,
	pub primary: PrimarySource,
	pub advisory: Option<String>,
}

/// Concatenates `batches` in order. A record whose id is already present replaces the earlier
/// entry in place, so later batches win and ids stay unique.
pub fn merge<I>(batches: I) -> Vec<Record>
where
	I: IntoIterator<Item = Vec<Record>>,
{
	let mut merged: Vec<Record> = Vec::new();
	let mut positions: AHashMap<String, usize> = AHashMap::new();

	for batch in batches {
		for record in batch {
			match positions.get(&record.id) {
				Some(&position) => merged[position] = record,
				None => {
					positions.insert(record.id.clone(), merged.len());
					merged.push(record);
				},
			}
		}
	}

	merged
}

impl CatalogService {
	/// Rebuilds the canonical collection and publishes it. Never fails; degraded sources are
	/// reported through [`Aggregation::advisory`].
	pub async fn load_catalog(&self) -> Aggregation {
		let now = OffsetDateTime::now_utc();
		let (primary, rooms) =
			tokio::join!(self.primary_machines(now), self.providers.records.list_rooms());
		let (machines, source) = primary;
		let rooms = rooms.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Room source unavailable. Continuing without rooms.");

			Vec::new()
		});
		let overlay = overlay::load(self.store.as_ref()).unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Failed to read local overlay.");

			Vec::new()
		});
		let room_os = Os::from(self.cfg.catalog.room_default_os.clone());
		let records = merge([
			htb_records(machines),
			rooms.into_iter().map(|room| room.into_record(&room_os)).collect(),
			htb_records(overlay),
		]);
		let aggregation = Aggregation {
			recent: recent::recently_completed(&records, self.cfg.catalog.recent_limit),
			records,
			primary: source,
			advisory: source.is_fallback().then(|| FALLBACK_ADVISORY.to_string()),
		};

		tracing::debug!(
			records = aggregation.records.len(),
			primary = ?aggregation.primary,
			"Catalog aggregated."
		);

		self.lock_view().set_records(aggregation.records.clone());
		self.catalog.send_replace(aggregation.clone());

		aggregation
	}

	async fn primary_machines(&self, now: OffsetDateTime) -> (Vec<Machine>, PrimarySource) {
		let store = self.store.as_ref();

		if let Some(cached) = self.records_cache.fresh(store, now) {
			return (cached, PrimarySource::Cache);
		}

		match self.providers.records.list_machines().await {
			Ok(machines) if !machines.is_empty() => {
				if let Err(err) = self.records_cache.put(store, machines.clone(), now) {
					tracing::warn!(error = %err, "Failed to cache primary machines.");
				}

				return (machines, PrimarySource::Remote);
			},
			Ok(_) => tracing::warn!("Primary source returned no machines. Falling back."),
			Err(err) => tracing::warn!(error = %err, "Primary source unavailable. Falling back."),
		}

		if let Some(stale) = self.records_cache.stale(store).filter(|machines| !machines.is_empty())
		{
			return (stale, PrimarySource::StaleCache);
		}
		if self.cfg.catalog.use_bundled {
			return (bundled::machines(), PrimarySource::Bundled);
		}

		(Vec::new(), PrimarySource::Unavailable)
	}
}

fn htb_records(machines: Vec<Machine>) -> Vec<Record> {
	machines.into_iter().map(|machine| machine.into_record(Platform::Htb)).collect()
}
