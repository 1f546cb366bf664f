//! Locally added or edited machines layered over remote data.

use serde_json::Value;

use crate::{KeyValueStore, Result};
use cyberlab_domain::Machine;

pub const OVERLAY_KEY: &str = "htb-machines";

/// Loads the overlay, skipping entries that fail to decode.
pub fn load(store: &dyn KeyValueStore) -> Result<Vec<Machine>> {
	let Some(raw) = store.get(OVERLAY_KEY)? else {
		return Ok(Vec::new());
	};
	let items = match serde_json::from_str::<Value>(&raw) {
		Ok(Value::Array(items)) => items,
		Ok(_) => {
			tracing::warn!(key = OVERLAY_KEY, "Discarding overlay that is not a list.");

			return Ok(Vec::new());
		},
		Err(err) => {
			tracing::warn!(key = OVERLAY_KEY, error = %err, "Discarding unreadable overlay.");

			return Ok(Vec::new());
		},
	};
	let mut machines = Vec::with_capacity(items.len());

	for (index, item) in items.into_iter().enumerate() {
		match serde_json::from_value::<Machine>(item) {
			Ok(machine) => machines.push(machine),
			Err(err) => {
				tracing::warn!(key = OVERLAY_KEY, index, error = %err, "Skipping malformed overlay entry.");
			},
		}
	}

	Ok(machines)
}

pub fn save(store: &dyn KeyValueStore, machines: &[Machine]) -> Result<()> {
	store.set(OVERLAY_KEY, &serde_json::to_string(machines)?)
}
