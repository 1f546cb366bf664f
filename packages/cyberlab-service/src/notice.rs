use std::{
	sync::{
		Arc, Weak,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use tokio::{runtime::Handle, sync::watch};

use cyberlab_providers::Error as ProviderError;

/// Shown when a write reaches the store but no database is bound behind it.
pub const STORE_UNAVAILABLE_NOTICE: &str =
	"Running in development mode - database operations not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
	Success,
	Advisory,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
	/// Increases with every post; lets a delayed clear tell whether it was replaced.
	pub id: u64,
	pub kind: NoticeKind,
	pub message: String,
}

struct Slot {
	tx: watch::Sender<Option<Notice>>,
	next_id: AtomicU64,
}

/// Single transient notice slot. Success notices clear themselves after a delay.
#[derive(Clone)]
pub struct NoticeBoard {
	slot: Arc<Slot>,
	clear_after: Duration,
}
impl NoticeBoard {
	pub fn new(clear_after: Duration) -> Self {
		let (tx, _) = watch::channel(None);

		Self { slot: Arc::new(Slot { tx, next_id: AtomicU64::new(0) }), clear_after }
	}

	pub fn current(&self) -> Option<Notice> {
		self.slot.tx.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
		self.slot.tx.subscribe()
	}

	pub fn success(&self, message: impl Into<String>) -> u64 {
		self.post(NoticeKind::Success, message.into())
	}

	pub fn advisory(&self, message: impl Into<String>) -> u64 {
		self.post(NoticeKind::Advisory, message.into())
	}

	pub fn error(&self, message: impl Into<String>) -> u64 {
		self.post(NoticeKind::Error, message.into())
	}

	/// Posts the notice matching a rejected write: an advisory when the store has no
	/// database, otherwise an error carrying the server's message.
	pub fn rejection(&self, action: &str, err: &ProviderError) -> u64 {
		if err.is_store_unavailable() {
			return self.advisory(STORE_UNAVAILABLE_NOTICE);
		}

		let reason = err.server_message().map(str::to_string).unwrap_or_else(|| err.to_string());

		self.error(format!("Failed to {action}: {reason}"))
	}

	pub fn dismiss(&self) {
		self.slot.tx.send_replace(None);
	}

	fn post(&self, kind: NoticeKind, message: String) -> u64 {
		let id = self.slot.next_id.fetch_add(1, Ordering::SeqCst) + 1;

		self.slot.tx.send_replace(Some(Notice { id, kind, message }));

		if kind == NoticeKind::Success {
			self.schedule_clear(id);
		}

		id
	}

	fn schedule_clear(&self, id: u64) {
		let Ok(handle) = Handle::try_current() else {
			tracing::debug!(id, "No runtime. Success notice will not self-clear.");

			return;
		};
		let slot: Weak<Slot> = Arc::downgrade(&self.slot);
		let delay = self.clear_after;

		handle.spawn(async move {
			tokio::time::sleep(delay).await;

			// The board may have been torn down meanwhile.
			let Some(slot) = slot.upgrade() else {
				return;
			};

			slot.tx.send_if_modified(|current| match current {
				Some(notice) if notice.id == id => {
					*current = None;

					true
				},
				_ => false,
			});
		});
	}
}
