use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{Error, NoticeBoard, Result, SaveTarget, StatsStore};
use cyberlab_domain::{FieldValue, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState<F> {
	Idle,
	Editing { field: F, draft: FieldValue },
	Committing { field: F },
}

struct Slot<S>
where
	S: Snapshot,
{
	current: S,
	edit: EditState<S::Field>,
}

/// Field-by-field editor for one statistics snapshot.
///
/// At most one field is being edited or committed at a time.
pub struct StatsEditor<S>
where
	S: Snapshot,
{
	store: Arc<dyn StatsStore<S>>,
	notices: NoticeBoard,
	slot: Mutex<Slot<S>>,
	snapshot: watch::Sender<S>,
}
impl<S> StatsEditor<S>
where
	S: Snapshot,
{
	pub fn new(store: Arc<dyn StatsStore<S>>, notices: NoticeBoard, initial: S) -> Self {
		let (snapshot, _) = watch::channel(initial.clone());

		Self { store, notices, slot: Mutex::new(Slot { current: initial, edit: EditState::Idle }), snapshot }
	}

	pub fn current(&self) -> S {
		self.lock().current.clone()
	}

	pub fn state(&self) -> EditState<S::Field> {
		self.lock().edit.clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<S> {
		self.snapshot.subscribe()
	}

	/// Starts editing `field` with its current value as the draft. Editing another field
	/// discards that field's draft.
	pub fn edit_field(&self, field: S::Field) -> Result<FieldValue> {
		let mut slot = self.lock();

		if let EditState::Committing { field: pending } = &slot.edit {
			return Err(Error::CommitInFlight { label: S::LABEL, field: pending.to_string() });
		}

		let draft = slot.current.value(field);

		slot.edit = EditState::Editing { field, draft: draft.clone() };

		Ok(draft)
	}

	/// Validates `raw` and stores it as the draft of the field being edited.
	pub fn set_draft(&self, raw: &str) -> Result<FieldValue> {
		let mut slot = self.lock();
		let EditState::Editing { field, draft } = &mut slot.edit else {
			return Err(Error::NotEditing { label: S::LABEL });
		};
		let value = S::parse_value(*field, raw)?;

		*draft = value.clone();

		Ok(value)
	}

	/// Drops the draft. Does nothing while a save is in flight.
	pub fn cancel_field(&self) {
		let mut slot = self.lock();

		if matches!(slot.edit, EditState::Editing { .. }) {
			slot.edit = EditState::Idle;
		}
	}

	/// Writes the draft through. On success the draft is adopted and stamped; on failure the
	/// previous snapshot stays and a notice is posted. Either way the editor returns to idle.
	///
	/// A write accepted by the fallback route still counts as saved, with its own notice.
	pub async fn save_field(&self) -> Result<S> {
		let (field, candidate) = {
			let mut slot = self.lock();
			let EditState::Editing { field, draft } = &slot.edit else {
				return Err(Error::NotEditing { label: S::LABEL });
			};
			let field = *field;
			let mut candidate = slot.current.clone();

			candidate.apply(field, draft.clone())?;
			candidate.stamp(OffsetDateTime::now_utc());

			slot.edit = EditState::Committing { field };

			(field, candidate)
		};
		let saved = self.store.save(&candidate).await;
		let mut slot = self.lock();

		slot.edit = EditState::Idle;

		match saved {
			Ok(target) => {
				slot.current = candidate.clone();

				drop(slot);

				let message = match target {
					SaveTarget::Database => format!("{} stats saved successfully!", S::LABEL),
					SaveTarget::Fallback => format!("{} stats saved to fallback storage!", S::LABEL),
				};

				self.snapshot.send_replace(candidate.clone());
				self.notices.success(message);
				tracing::info!(label = S::LABEL, %field, ?target, "Stats field saved.");

				Ok(candidate)
			},
			Err(err) => {
				drop(slot);

				self.notices.rejection(&format!("save {} stats", S::LABEL), &err);
				tracing::warn!(label = S::LABEL, %field, error = %err, "Stats save rejected.");

				Err(Error::Provider(err))
			},
		}
	}

	/// Adopts a freshly loaded snapshot.
	pub(crate) fn replace_current(&self, stats: S) {
		self.lock().current = stats.clone();
		self.snapshot.send_replace(stats);
	}

	fn lock(&self) -> MutexGuard<'_, Slot<S>> {
		self.slot.lock().unwrap_or_else(|err| err.into_inner())
	}
}
