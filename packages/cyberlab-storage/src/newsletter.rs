use crate::{KeyValueStore, Result};

pub const NEWSLETTER_KEY: &str = "newsletterPopupStatus";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStatus {
	Closed,
	Submitted,
}
impl PopupStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Closed => "closed",
			Self::Submitted => "submitted",
		}
	}
}

/// Stored dismissal, if any. Unrecognized values count as none.
pub fn status(store: &dyn KeyValueStore) -> Result<Option<PopupStatus>> {
	Ok(match store.get(NEWSLETTER_KEY)?.as_deref() {
		Some("closed") => Some(PopupStatus::Closed),
		Some("submitted") => Some(PopupStatus::Submitted),
		_ => None,
	})
}

pub fn should_show(store: &dyn KeyValueStore) -> Result<bool> {
	Ok(status(store)?.is_none())
}

pub fn record(store: &dyn KeyValueStore, status: PopupStatus) -> Result<()> {
	store.set(NEWSLETTER_KEY, status.as_str())
}
