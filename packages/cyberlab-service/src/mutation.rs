//! Write-through mutations, handed out only while the admin gate is open.

use cyberlab_domain::{HtbStats, Machine, NewMachine, Platform, Record, ThmStats};

use crate::{CatalogService, Error, Result, StatsEditor};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this machine?";

/// Asks the operator before a destructive action.
pub trait Confirm
where
	Self: Send + Sync,
{
	fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything. For non-interactive callers that already asked.
pub struct AutoConfirm;
impl Confirm for AutoConfirm {
	fn confirm(&self, _prompt: &str) -> bool {
		true
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
	Deleted,
	/// The confirmer said no; nothing was sent.
	Declined,
	/// The store refused; a notice was posted and the collection is unchanged.
	Rejected,
}

pub struct AdminActions<'a> {
	service: &'a CatalogService,
}
impl<'a> AdminActions<'a> {
	pub(crate) fn new(service: &'a CatalogService) -> Self {
		Self { service }
	}

	/// Creates a machine and appends the stored copy to the collection.
	pub async fn create(&self, machine: NewMachine) -> Result<Record> {
		let service = self.service;

		match service.providers.records.create_machine(&machine).await {
			Ok(stored) => {
				let record = stored.into_record(Platform::Htb);

				service.patch_catalog(|view| view.upsert(record.clone()));
				service.notices.success("Machine added successfully!");
				tracing::info!(id = %record.id, "Machine added.");

				Ok(record)
			},
			Err(err) => Err(self.rejected("add machine", err)),
		}
	}

	/// Writes `machine` and replaces the entry with the same id.
	pub async fn update(&self, machine: Machine) -> Result<Record> {
		let service = self.service;

		match service.providers.records.update_machine(&machine).await {
			Ok(stored) => {
				let record = stored.into_record(Platform::Htb);

				if !service.patch_catalog(|view| view.replace(record.clone())) {
					tracing::debug!(id = %record.id, "Updated machine is not in the collection.");
				}

				service.notices.success("Machine updated successfully!");
				tracing::info!(id = %record.id, "Machine updated.");

				Ok(record)
			},
			Err(err) => Err(self.rejected("update machine", err)),
		}
	}

	/// Deletes after confirmation. A declined confirmation issues no request.
	pub async fn delete(&self, id: &str, confirm: &dyn Confirm) -> Result<DeleteOutcome> {
		let service = self.service;
		let id = id.trim();

		if id.is_empty() {
			return Err(Error::InvalidRequest { message: "Machine id must be non-empty.".to_string() });
		}
		if !confirm.confirm(DELETE_PROMPT) {
			return Ok(DeleteOutcome::Declined);
		}

		match service.providers.records.delete_machine(id).await {
			Ok(()) => {
				service.patch_catalog(|view| view.remove(id));
				service.notices.success("Machine deleted successfully!");
				tracing::info!(id, "Machine deleted.");

				Ok(DeleteOutcome::Deleted)
			},
			Err(err) => {
				service.notices.rejection("delete machine", &err);
				tracing::warn!(id, error = %err, "Machine delete rejected.");

				Ok(DeleteOutcome::Rejected)
			},
		}
	}

	pub fn htb_stats(&self) -> &'a StatsEditor<HtbStats> {
		self.service.htb_editor()
	}

	pub fn thm_stats(&self) -> &'a StatsEditor<ThmStats> {
		self.service.thm_editor()
	}

	fn rejected(&self, action: &str, err: cyberlab_providers::Error) -> Error {
		self.service.notices.rejection(action, &err);
		tracing::warn!(action, error = %err, "Write rejected.");

		Error::Provider(err)
	}
}
