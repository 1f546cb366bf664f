//! Key-value persistence for client-side state.
//!
//! Everything the client keeps between runs (cache entries, the local overlay, the newsletter
//! flag) goes through [`KeyValueStore`], so tests can swap in [`MemoryStore`].

use std::{
	collections::BTreeMap,
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
	sync::Mutex,
};

use tokio::sync::broadcast;

use crate::{Error, Result};

const CHANGE_CAPACITY: usize = 64;

/// A key whose value was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
	pub key: String,
}

pub trait KeyValueStore
where
	Self: Send + Sync,
{
	fn get(&self, key: &str) -> Result<Option<String>>;

	fn set(&self, key: &str, value: &str) -> Result<()>;

	fn remove(&self, key: &str) -> Result<()>;

	/// Feed of key-level changes made through this store.
	fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

pub struct MemoryStore {
	entries: Mutex<BTreeMap<String, String>>,
	changes: broadcast::Sender<StorageChange>,
}
impl MemoryStore {
	pub fn new() -> Self {
		let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

		Self { entries: Mutex::new(BTreeMap::new()), changes }
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}
impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		Ok(entries.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		{
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.insert(key.to_string(), value.to_string());
		}

		notify(&self.changes, key);

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		let removed = {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.remove(key).is_some()
		};

		if removed {
			notify(&self.changes, key);
		}

		Ok(())
	}

	fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
		self.changes.subscribe()
	}
}

/// JSON-object file holding every key. Writes replace the file through a temporary sibling.
pub struct FileStore {
	path: PathBuf,
	entries: Mutex<BTreeMap<String, String>>,
	changes: broadcast::Sender<StorageChange>,
}
impl FileStore {
	/// Opens `path`, starting empty when the file is missing or unreadable as JSON.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let entries = read_entries(&path)?;
		let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

		Ok(Self { path, entries: Mutex::new(entries), changes })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Re-reads the file and announces every key another process changed since the last read.
	pub fn reload(&self) -> Result<Vec<StorageChange>> {
		let fresh = read_entries(&self.path)?;
		let changed: Vec<StorageChange> = {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
			let mut changed: Vec<String> = fresh
				.iter()
				.filter(|(key, value)| entries.get(*key) != Some(*value))
				.map(|(key, _)| key.clone())
				.collect();

			changed.extend(entries.keys().filter(|key| !fresh.contains_key(*key)).cloned());

			*entries = fresh;

			changed.into_iter().map(|key| StorageChange { key }).collect()
		};

		for change in &changed {
			let _ = self.changes.send(change.clone());
		}

		Ok(changed)
	}

	fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
		let raw = serde_json::to_vec_pretty(entries)?;
		let tmp = self.path.with_extension("tmp");

		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent)
				.map_err(|err| Error::Io { path: parent.to_path_buf(), source: err })?;
		}

		fs::write(&tmp, raw).map_err(|err| Error::Io { path: tmp.clone(), source: err })?;
		fs::rename(&tmp, &self.path)
			.map_err(|err| Error::Io { path: self.path.clone(), source: err })?;

		Ok(())
	}
}
impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		Ok(entries.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		{
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.insert(key.to_string(), value.to_string());

			self.persist(&entries)?;
		}

		notify(&self.changes, key);

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		{
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			if entries.remove(key).is_none() {
				return Ok(());
			}

			self.persist(&entries)?;
		}

		notify(&self.changes, key);

		Ok(())
	}

	fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
		self.changes.subscribe()
	}
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
	let raw = match fs::read(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
		Err(err) => return Err(Error::Io { path: path.to_path_buf(), source: err }),
	};

	match serde_json::from_slice(&raw) {
		Ok(entries) => Ok(entries),
		Err(err) => {
			tracing::warn!(path = %path.display(), error = %err, "Discarding unreadable state file.");

			Ok(BTreeMap::new())
		},
	}
}

// Sending fails only when nobody is subscribed.
fn notify(changes: &broadcast::Sender<StorageChange>, key: &str) {
	let _ = changes.send(StorageChange { key: key.to_string() });
}
