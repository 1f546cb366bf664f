use std::{marker::PhantomData, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use crate::{KeyValueStore, Result};

/// Stored form of a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEntry<T> {
	pub value: T,
	/// Unix milliseconds.
	pub stored_at: i64,
}

/// A value cached under one key with a freshness window.
pub struct TimedCache<T> {
	key: String,
	ttl: Duration,
	_value: PhantomData<fn() -> T>,
}
impl<T> TimedCache<T>
where
	T: Serialize + DeserializeOwned,
{
	pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
		Self { key: key.into(), ttl, _value: PhantomData }
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// The cached value if it was stored less than one TTL before `now`.
	pub fn fresh(&self, store: &dyn KeyValueStore, now: OffsetDateTime) -> Option<T> {
		let entry = self.read(store)?;
		let age_ms = unix_millis(now).saturating_sub(entry.stored_at);

		if age_ms < self.ttl.as_millis() as i64 { Some(entry.value) } else { None }
	}

	/// The cached value regardless of age.
	pub fn stale(&self, store: &dyn KeyValueStore) -> Option<T> {
		self.read(store).map(|entry| entry.value)
	}

	pub fn put(&self, store: &dyn KeyValueStore, value: T, now: OffsetDateTime) -> Result<()> {
		let entry = TimedEntry { value, stored_at: unix_millis(now) };

		store.set(&self.key, &serde_json::to_string(&entry)?)
	}

	pub fn expire(&self, store: &dyn KeyValueStore) -> Result<()> {
		store.remove(&self.key)
	}

	// Unreadable entries are dropped so the next write starts clean.
	fn read(&self, store: &dyn KeyValueStore) -> Option<TimedEntry<T>> {
		let raw = match store.get(&self.key) {
			Ok(raw) => raw?,
			Err(err) => {
				tracing::warn!(key = %self.key, error = %err, "Failed to read cache entry.");

				return None;
			},
		};

		match serde_json::from_str(&raw) {
			Ok(entry) => Some(entry),
			Err(err) => {
				tracing::warn!(key = %self.key, error = %err, "Discarding malformed cache entry.");

				if let Err(err) = store.remove(&self.key) {
					tracing::warn!(key = %self.key, error = %err, "Failed to discard cache entry.");
				}

				None
			},
		}
	}
}

pub fn unix_millis(ts: OffsetDateTime) -> i64 {
	(ts.unix_timestamp_nanos() / 1_000_000) as i64
}
