//! Profile statistics snapshots and their field-level editing surface.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
	Count(u64),
	Text(String),
}
impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Count(value) => value.fmt(f),
			Self::Text(value) => f.write_str(value),
		}
	}
}

/// A singleton statistics record edited one field at a time.
pub trait Snapshot
where
	Self: Clone + Send + Sync + 'static,
{
	type Field: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;

	const LABEL: &'static str;

	fn value(&self, field: Self::Field) -> FieldValue;

	/// Validates `raw` for `field` without touching the snapshot.
	fn parse_value(field: Self::Field, raw: &str) -> Result<FieldValue>;

	fn apply(&mut self, field: Self::Field, value: FieldValue) -> Result<()>;

	fn stamp(&mut self, at: OffsetDateTime);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtbRank {
	Noob,
	#[serde(rename = "Script Kiddie")]
	ScriptKiddie,
	Hacker,
	#[serde(rename = "Pro Hacker")]
	ProHacker,
	#[serde(rename = "Elite Hacker")]
	EliteHacker,
	Guru,
	Omniscient,
}
impl HtbRank {
	pub const ALL: [Self; 7] = [
		Self::Noob,
		Self::ScriptKiddie,
		Self::Hacker,
		Self::ProHacker,
		Self::EliteHacker,
		Self::Guru,
		Self::Omniscient,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Noob => "Noob",
			Self::ScriptKiddie => "Script Kiddie",
			Self::Hacker => "Hacker",
			Self::ProHacker => "Pro Hacker",
			Self::EliteHacker => "Elite Hacker",
			Self::Guru => "Guru",
			Self::Omniscient => "Omniscient",
		}
	}
}
impl FromStr for HtbRank {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|rank| rank.as_str().eq_ignore_ascii_case(raw)).ok_or_else(|| {
			Error::InvalidField {
				field: "htb_rank".to_string(),
				message: format!("unknown rank {raw:?}"),
			}
		})
	}
}
impl fmt::Display for HtbRank {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HtbField {
	MachinesPwned,
	GlobalRanking,
	FinalScore,
	HtbRank,
}
impl FromStr for HtbField {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match squash(raw).as_str() {
			"machinespwned" => Ok(Self::MachinesPwned),
			"globalranking" => Ok(Self::GlobalRanking),
			"finalscore" => Ok(Self::FinalScore),
			"htbrank" | "rank" => Ok(Self::HtbRank),
			_ => Err(unknown_field("HTB", raw)),
		}
	}
}
impl fmt::Display for HtbField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::MachinesPwned => "machines_pwned",
			Self::GlobalRanking => "global_ranking",
			Self::FinalScore => "final_score",
			Self::HtbRank => "htb_rank",
		})
	}
}

/// HTB profile counters. Encodes with the store's snake_case keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HtbStatsWire")]
pub struct HtbStats {
	pub machines_pwned: u64,
	pub global_ranking: u64,
	pub final_score: u64,
	pub htb_rank: HtbRank,
	pub last_updated: String,
}
impl Default for HtbStats {
	fn default() -> Self {
		Self {
			machines_pwned: 127,
			global_ranking: 15_420,
			final_score: 890,
			htb_rank: HtbRank::Hacker,
			last_updated: crate::dates::format(OffsetDateTime::now_utc()),
		}
	}
}
impl Snapshot for HtbStats {
	type Field = HtbField;

	const LABEL: &'static str = "HTB";

	fn value(&self, field: HtbField) -> FieldValue {
		match field {
			HtbField::MachinesPwned => FieldValue::Count(self.machines_pwned),
			HtbField::GlobalRanking => FieldValue::Count(self.global_ranking),
			HtbField::FinalScore => FieldValue::Count(self.final_score),
			HtbField::HtbRank => FieldValue::Text(self.htb_rank.as_str().to_string()),
		}
	}

	fn parse_value(field: HtbField, raw: &str) -> Result<FieldValue> {
		match field {
			HtbField::HtbRank => Ok(FieldValue::Text(raw.parse::<HtbRank>()?.as_str().to_string())),
			_ => parse_count(&field.to_string(), raw),
		}
	}

	fn apply(&mut self, field: HtbField, value: FieldValue) -> Result<()> {
		match (field, value) {
			(HtbField::MachinesPwned, FieldValue::Count(value)) => self.machines_pwned = value,
			(HtbField::GlobalRanking, FieldValue::Count(value)) => self.global_ranking = value,
			(HtbField::FinalScore, FieldValue::Count(value)) => self.final_score = value,
			(HtbField::HtbRank, FieldValue::Text(value)) => self.htb_rank = value.parse()?,
			(field, value) => return Err(mismatched(&field.to_string(), &value)),
		}

		Ok(())
	}

	fn stamp(&mut self, at: OffsetDateTime) {
		self.last_updated = crate::dates::format(at);
	}
}
impl HtbStats {
	pub fn camel_case(&self) -> HtbStatsCamel<'_> {
		HtbStatsCamel {
			machines_pwned: self.machines_pwned,
			global_ranking: self.global_ranking,
			final_score: self.final_score,
			htb_rank: self.htb_rank,
			last_updated: &self.last_updated,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThmField {
	ThmRank,
	RoomsCompleted,
	Streak,
}
impl FromStr for ThmField {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match squash(raw).as_str() {
			"thmrank" | "rank" => Ok(Self::ThmRank),
			"roomscompleted" => Ok(Self::RoomsCompleted),
			"streak" => Ok(Self::Streak),
			_ => Err(unknown_field("THM", raw)),
		}
	}
}
impl fmt::Display for ThmField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::ThmRank => "thm_rank",
			Self::RoomsCompleted => "rooms_completed",
			Self::Streak => "streak",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
	pub name: String,
	#[serde(default)]
	pub icon: String,
	#[serde(default)]
	pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThmStats {
	pub thm_rank: String,
	pub rooms_completed: u64,
	pub streak: u64,
	pub badges: Vec<Badge>,
	pub last_updated: String,
}
impl Default for ThmStats {
	fn default() -> Self {
		Self {
			thm_rank: "Beginner".to_string(),
			rooms_completed: 5,
			streak: 3,
			badges: Vec::new(),
			last_updated: crate::dates::format(OffsetDateTime::now_utc()),
		}
	}
}
impl Snapshot for ThmStats {
	type Field = ThmField;

	const LABEL: &'static str = "THM";

	fn value(&self, field: ThmField) -> FieldValue {
		match field {
			ThmField::ThmRank => FieldValue::Text(self.thm_rank.clone()),
			ThmField::RoomsCompleted => FieldValue::Count(self.rooms_completed),
			ThmField::Streak => FieldValue::Count(self.streak),
		}
	}

	fn parse_value(field: ThmField, raw: &str) -> Result<FieldValue> {
		match field {
			ThmField::ThmRank => {
				let rank = raw.trim();

				if rank.is_empty() {
					return Err(Error::InvalidField {
						field: field.to_string(),
						message: "rank must be non-empty".to_string(),
					});
				}

				Ok(FieldValue::Text(rank.to_string()))
			},
			_ => parse_count(&field.to_string(), raw),
		}
	}

	fn apply(&mut self, field: ThmField, value: FieldValue) -> Result<()> {
		match (field, value) {
			(ThmField::ThmRank, FieldValue::Text(value)) => self.thm_rank = value,
			(ThmField::RoomsCompleted, FieldValue::Count(value)) => self.rooms_completed = value,
			(ThmField::Streak, FieldValue::Count(value)) => self.streak = value,
			(field, value) => return Err(mismatched(&field.to_string(), &value)),
		}

		Ok(())
	}

	fn stamp(&mut self, at: OffsetDateTime) {
		self.last_updated = crate::dates::format(at);
	}
}

// The store has answered with both key styles over time, sometimes in one body. Snake case wins;
// zero counters and blank strings count as unset.
#[derive(Deserialize)]
struct HtbStatsWire {
	#[serde(default)]
	machines_pwned: Option<u64>,
	#[serde(default, rename = "machinesPwned")]
	machines_pwned_camel: Option<u64>,
	#[serde(default)]
	global_ranking: Option<u64>,
	#[serde(default, rename = "globalRanking")]
	global_ranking_camel: Option<u64>,
	#[serde(default)]
	final_score: Option<u64>,
	#[serde(default, rename = "finalScore")]
	final_score_camel: Option<u64>,
	#[serde(default)]
	htb_rank: Option<String>,
	#[serde(default, rename = "htbRank")]
	htb_rank_camel: Option<String>,
	#[serde(default)]
	last_updated: Option<String>,
	#[serde(default, rename = "lastUpdated")]
	last_updated_camel: Option<String>,
}
impl From<HtbStatsWire> for HtbStats {
	fn from(wire: HtbStatsWire) -> Self {
		let defaults = Self::default();

		Self {
			machines_pwned: count(wire.machines_pwned, wire.machines_pwned_camel)
				.unwrap_or(defaults.machines_pwned),
			global_ranking: count(wire.global_ranking, wire.global_ranking_camel)
				.unwrap_or(defaults.global_ranking),
			final_score: count(wire.final_score, wire.final_score_camel)
				.unwrap_or(defaults.final_score),
			htb_rank: text(wire.htb_rank, wire.htb_rank_camel)
				.and_then(|rank| rank.parse().ok())
				.unwrap_or(defaults.htb_rank),
			last_updated: text(wire.last_updated, wire.last_updated_camel)
				.unwrap_or(defaults.last_updated),
		}
	}
}

/// Camel-case body accepted by the profile routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtbStatsCamel<'a> {
	pub machines_pwned: u64,
	pub global_ranking: u64,
	pub final_score: u64,
	pub htb_rank: HtbRank,
	pub last_updated: &'a str,
}

fn count(snake: Option<u64>, camel: Option<u64>) -> Option<u64> {
	snake.filter(|value| *value > 0).or_else(|| camel.filter(|value| *value > 0))
}

fn text(snake: Option<String>, camel: Option<String>) -> Option<String> {
	snake
		.filter(|value| !value.trim().is_empty())
		.or_else(|| camel.filter(|value| !value.trim().is_empty()))
}

fn squash(raw: &str) -> String {
	raw.chars().filter(|c| c.is_ascii_alphanumeric()).map(|c| c.to_ascii_lowercase()).collect()
}

fn parse_count(field: &str, raw: &str) -> Result<FieldValue> {
	raw.trim().parse::<u64>().map(FieldValue::Count).map_err(|err| Error::InvalidField {
		field: field.to_string(),
		message: err.to_string(),
	})
}

fn unknown_field(label: &str, raw: &str) -> Error {
	Error::InvalidField { field: raw.to_string(), message: format!("not a {label} stats field") }
}

fn mismatched(field: &str, value: &FieldValue) -> Error {
	Error::InvalidField { field: field.to_string(), message: format!("unexpected value {value}") }
}
