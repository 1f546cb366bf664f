use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

macro_rules! label_enum {
	($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(from = "String", into = "String")]
		pub enum $name {
			$($variant,)+
			Other(String),
		}
		impl $name {
			pub fn as_str(&self) -> &str {
				match self {
					$(Self::$variant => $label,)+
					Self::Other(raw) => raw.as_str(),
				}
			}
		}
		impl From<String> for $name {
			fn from(raw: String) -> Self {
				let trimmed = raw.trim();

				$(
					if trimmed.eq_ignore_ascii_case($label) {
						return Self::$variant;
					}
				)+

				Self::Other(trimmed.to_string())
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.as_str().to_string()
			}
		}
		impl FromStr for $name {
			type Err = Infallible;

			fn from_str(raw: &str) -> Result<Self, Self::Err> {
				Ok(Self::from(raw.to_string()))
			}
		}
		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}
	};
}

label_enum!(Os { Linux => "Linux", Windows => "Windows" });
label_enum!(Difficulty { Easy => "Easy", Medium => "Medium", Hard => "Hard", Insane => "Insane" });
label_enum!(Status { Completed => "Completed", InProgress => "In Progress" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
	Htb,
	Thm,
}
impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Htb => f.write_str("HTB"),
			Self::Thm => f.write_str("THM"),
		}
	}
}

/// Canonical catalog entry. `platform` is fixed when the record is ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
	pub id: String,
	pub name: String,
	pub os: Os,
	pub difficulty: Difficulty,
	pub status: Status,
	#[serde(default)]
	pub date_completed: Option<String>,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub writeup: Option<String>,
	pub platform: Platform,
}
impl Record {
	/// Completion instant, when the record is completed and its date parses.
	pub fn completed_at(&self) -> Option<OffsetDateTime> {
		if self.status != Status::Completed {
			return None;
		}

		self.date_completed.as_deref().and_then(crate::dates::parse)
	}

	pub fn to_machine(&self) -> Machine {
		Machine {
			id: self.id.clone(),
			name: self.name.clone(),
			os: self.os.clone(),
			difficulty: self.difficulty.clone(),
			status: self.status.clone(),
			date_completed: self.date_completed.clone(),
			tags: self.tags.clone(),
			writeup: self.writeup.clone(),
		}
	}
}

/// Machine as stored by the primary store and the local overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
	#[serde(deserialize_with = "deserialize_id")]
	pub id: String,
	pub name: String,
	pub os: Os,
	pub difficulty: Difficulty,
	pub status: Status,
	#[serde(default)]
	pub date_completed: Option<String>,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub writeup: Option<String>,
}
impl Machine {
	pub fn into_record(self, platform: Platform) -> Record {
		Record {
			id: self.id,
			name: self.name,
			os: self.os,
			difficulty: self.difficulty,
			status: self.status,
			date_completed: non_blank(self.date_completed),
			tags: self.tags,
			writeup: non_blank(self.writeup),
			platform,
		}
	}
}

/// Create body: a machine whose id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMachine {
	pub name: String,
	pub os: Os,
	pub difficulty: Difficulty,
	pub status: Status,
	pub date_completed: Option<String>,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	pub writeup: Option<String>,
}

/// Room as reported by the secondary store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Room {
	#[serde(deserialize_with = "deserialize_id")]
	pub id: String,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub name: Option<String>,
	pub difficulty: Difficulty,
	pub status: Status,
	#[serde(default, rename = "dateCompleted")]
	pub date_completed: Option<String>,
	#[serde(default, rename = "date_completed")]
	pub date_completed_snake: Option<String>,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub writeup: Option<String>,
	#[serde(default, rename = "roomCode")]
	pub room_code: Option<String>,
	#[serde(default)]
	pub points: Option<u64>,
}
impl Room {
	pub fn into_record(self, default_os: &Os) -> Record {
		let name = non_blank(self.title).or_else(|| non_blank(self.name)).unwrap_or_default();
		let date_completed =
			non_blank(self.date_completed).or_else(|| non_blank(self.date_completed_snake));

		Record {
			id: self.id,
			name,
			os: default_os.clone(),
			difficulty: self.difficulty,
			status: self.status,
			date_completed,
			tags: self.tags,
			writeup: non_blank(self.writeup),
			platform: Platform::Thm,
		}
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|raw| !raw.trim().is_empty())
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(id) => Ok(id),
		Value::Number(id) => Ok(id.to_string()),
		other => Err(serde::de::Error::custom(format!("id must be a string or number, got {other}"))),
	}
}
