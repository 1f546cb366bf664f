//! Admin capability flag derived from the session collaborator.
//!
//! The flag only decides which mutation entry points are offered; the write routes authorize
//! every request on their own.

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use tokio::{
	sync::{broadcast, watch},
	task::JoinHandle,
};

use crate::SessionProvider;

const SIGNAL_CAPACITY: usize = 16;

/// "Admin mode changed" announcements. Anyone may publish; the gate re-checks on each one.
#[derive(Clone)]
pub struct AdminSignal {
	tx: broadcast::Sender<()>,
}
impl AdminSignal {
	pub fn new() -> Self {
		let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);

		Self { tx }
	}

	pub fn publish(&self) {
		// No subscribers just means nobody is gating anything yet.
		let _ = self.tx.send(());
	}

	pub fn subscribe(&self) -> broadcast::Receiver<()> {
		self.tx.subscribe()
	}
}
impl Default for AdminSignal {
	fn default() -> Self {
		Self::new()
	}
}

pub struct AdminGate {
	session: Arc<dyn SessionProvider>,
	timeout: Duration,
	issued: AtomicU64,
	flag: watch::Sender<bool>,
}
impl AdminGate {
	pub fn new(session: Arc<dyn SessionProvider>, timeout: Duration) -> Self {
		let (flag, _) = watch::channel(false);

		Self { session, timeout, issued: AtomicU64::new(0), flag }
	}

	pub fn is_admin(&self) -> bool {
		*self.flag.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<bool> {
		self.flag.subscribe()
	}

	/// Queries the session collaborator and publishes the outcome.
	///
	/// Failures and timeouts resolve to `false`. A check overtaken by a newer one publishes
	/// nothing and also resolves to `false`.
	pub async fn check(&self) -> bool {
		let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
		let outcome = match tokio::time::timeout(self.timeout, self.session.session_status()).await {
			Ok(Ok(authenticated)) => authenticated,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Session check failed. Treating as anonymous.");

				false
			},
			Err(_) => {
				tracing::warn!(
					timeout_ms = self.timeout.as_millis() as u64,
					"Session check timed out. Treating as anonymous."
				);

				false
			},
		};
		let mut published = false;

		self.flag.send_if_modified(|flag| {
			if self.issued.load(Ordering::SeqCst) != ticket {
				return false;
			}

			published = true;

			let changed = *flag != outcome;

			*flag = outcome;

			changed
		});

		if !published {
			tracing::debug!(ticket, "Session check superseded. Discarding result.");

			return false;
		}

		outcome
	}

	/// Re-checks on every signal until the signal channel closes.
	pub fn follow(self: Arc<Self>, signal: &AdminSignal) -> JoinHandle<()> {
		let mut rx = signal.subscribe();

		tokio::spawn(async move {
			loop {
				match rx.recv().await {
					Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
						let admin = self.check().await;

						tracing::debug!(admin, "Admin mode re-derived.");
					},
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		})
	}
}
