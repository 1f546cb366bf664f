use std::{convert::Infallible, fmt, str::FromStr};

use serde::Serialize;

use crate::record::{Difficulty, Os, Record, Status};

/// Equality criterion that can be switched off with the `All` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice<T> {
	All,
	Only(T),
}
impl<T> Choice<T>
where
	T: PartialEq,
{
	pub fn admits(&self, value: &T) -> bool {
		match self {
			Self::All => true,
			Self::Only(expected) => expected == value,
		}
	}

	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}
}
impl<T> Default for Choice<T> {
	fn default() -> Self {
		Self::All
	}
}
impl<T> FromStr for Choice<T>
where
	T: FromStr<Err = Infallible>,
{
	type Err = Infallible;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let raw = raw.trim();

		if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
			return Ok(Self::All);
		}

		Ok(Self::Only(T::from_str(raw)?))
	}
}
impl<T> fmt::Display for Choice<T>
where
	T: fmt::Display,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::All => f.write_str("All"),
			Self::Only(value) => value.fmt(f),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
	pub search: String,
	pub os: Choice<Os>,
	pub difficulty: Choice<Difficulty>,
	pub status: Choice<Status>,
}
impl Criteria {
	/// Every active criterion must hold. A blank search term is inactive.
	pub fn matches(&self, record: &Record) -> bool {
		self.matches_with(&self.search.trim().to_lowercase(), record)
	}

	/// Projects `records` through the criteria, keeping their order.
	pub fn apply(&self, records: &[Record]) -> Vec<Record> {
		let needle = self.search.trim().to_lowercase();

		records
			.iter()
			.filter(|record| self.matches_with(&needle, record))
			.cloned()
			.collect()
	}

	pub fn is_unfiltered(&self) -> bool {
		self.search.trim().is_empty()
			&& self.os.is_all()
			&& self.difficulty.is_all()
			&& self.status.is_all()
	}

	pub fn clear(&mut self) {
		*self = Self::default();
	}

	fn matches_with(&self, needle: &str, record: &Record) -> bool {
		let search_hit = needle.is_empty()
			|| record.name.to_lowercase().contains(needle)
			|| record.tags.iter().any(|tag| tag.to_lowercase().contains(needle));

		search_hit
			&& self.os.admits(&record.os)
			&& self.difficulty.admits(&record.difficulty)
			&& self.status.admits(&record.status)
	}
}

/// Counters shown above the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
	pub total: usize,
	pub completed: usize,
	pub in_progress: usize,
	pub easy: usize,
	pub medium: usize,
	pub hard: usize,
}
impl CatalogSummary {
	pub fn of(records: &[Record]) -> Self {
		let mut summary = Self { total: records.len(), ..Self::default() };

		for record in records {
			match record.status {
				Status::Completed => summary.completed += 1,
				Status::InProgress => summary.in_progress += 1,
				Status::Other(_) => {},
			}
			match record.difficulty {
				Difficulty::Easy => summary.easy += 1,
				Difficulty::Medium => summary.medium += 1,
				Difficulty::Hard => summary.hard += 1,
				_ => {},
			}
		}

		summary
	}
}
