use cyberlab_domain::{CatalogSummary, Criteria, Record, recent};

/// Canonical collection plus the user's criteria. The visible projection is re-derived on
/// every change to either.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
	records: Vec<Record>,
	criteria: Criteria,
	visible: Vec<Record>,
}
impl CatalogView {
	pub fn new(records: Vec<Record>) -> Self {
		let mut view = Self { records, ..Self::default() };

		view.rederive();

		view
	}

	pub fn records(&self) -> &[Record] {
		&self.records
	}

	pub fn criteria(&self) -> &Criteria {
		&self.criteria
	}

	pub fn visible(&self) -> &[Record] {
		&self.visible
	}

	pub fn summary(&self) -> CatalogSummary {
		CatalogSummary::of(&self.records)
	}

	pub fn recent(&self, limit: usize) -> Vec<Record> {
		recent::recently_completed(&self.records, limit)
	}

	pub fn set_records(&mut self, records: Vec<Record>) {
		self.records = records;

		self.rederive();
	}

	pub fn set_criteria(&mut self, criteria: Criteria) {
		self.criteria = criteria;

		self.rederive();
	}

	/// Resets every criterion in one step.
	pub fn clear_criteria(&mut self) {
		self.criteria.clear();

		self.rederive();
	}

	/// Appends `record`, or replaces the entry holding its id.
	pub fn upsert(&mut self, record: Record) {
		match self.records.iter_mut().find(|existing| existing.id == record.id) {
			Some(slot) => *slot = record,
			None => self.records.push(record),
		}

		self.rederive();
	}

	/// Replaces the entry holding `record.id`. Returns false when no such entry exists.
	pub fn replace(&mut self, record: Record) -> bool {
		let Some(slot) = self.records.iter_mut().find(|existing| existing.id == record.id) else {
			return false;
		};

		*slot = record;

		self.rederive();

		true
	}

	pub fn remove(&mut self, id: &str) -> bool {
		let before = self.records.len();

		self.records.retain(|record| record.id != id);

		let removed = self.records.len() != before;

		if removed {
			self.rederive();
		}

		removed
	}

	fn rederive(&mut self) {
		self.visible = self.criteria.apply(&self.records);
	}
}
