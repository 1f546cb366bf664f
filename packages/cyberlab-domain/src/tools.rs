use std::collections::HashSet;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub link: Option<String>,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub stars: Option<u64>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub last_updated: Option<String>,
	#[serde(default)]
	pub published_at: Option<String>,
}
impl Tool {
	fn recency(&self) -> OffsetDateTime {
		self.last_updated
			.as_deref()
			.or(self.published_at.as_deref())
			.and_then(crate::dates::parse)
			.unwrap_or(OffsetDateTime::UNIX_EPOCH)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default, deserialize_with = "crate::tags::deserialize")]
	pub tags: Vec<String>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub last_updated: Option<String>,
}
impl Payload {
	/// Payloads carry no link or stars; an undated payload is dated `fetched_at`.
	pub fn into_tool(self, fetched_at: OffsetDateTime) -> Tool {
		Tool {
			id: self.id,
			name: self.name,
			description: self.description,
			link: None,
			tags: self.tags,
			stars: None,
			language: self.language,
			last_updated: Some(
				self.last_updated.unwrap_or_else(|| crate::dates::format(fetched_at)),
			),
			published_at: None,
		}
	}
}

/// Decodes one feed item, rejecting anything without a usable id and name.
pub fn decode_item<T>(kind: &'static str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	let id_ok = value
		.get("id")
		.and_then(Value::as_str)
		.map(|id| !id.trim().is_empty())
		.unwrap_or(false);
	let name_ok = value
		.get("name")
		.and_then(Value::as_str)
		.map(|name| !name.trim().is_empty())
		.unwrap_or(false);

	if !id_ok || !name_ok {
		return Err(Error::Malformed { kind, message: "id and name must be non-empty strings".to_string() });
	}

	serde_json::from_value(value)
		.map_err(|err| Error::Malformed { kind, message: err.to_string() })
}

/// Deduplicates by id or name (first occurrence wins), orders newest first with stars as the
/// tie-breaker, and keeps `limit` items.
pub fn latest(tools: Vec<Tool>, limit: usize) -> Vec<Tool> {
	let mut seen_ids = HashSet::new();
	let mut seen_names = HashSet::new();
	let mut unique = Vec::with_capacity(tools.len());

	for tool in tools {
		let duplicate = seen_ids.contains(&tool.id) || seen_names.contains(&tool.name);

		seen_ids.insert(tool.id.clone());
		seen_names.insert(tool.name.clone());

		if !duplicate {
			unique.push(tool);
		}
	}

	unique.sort_by(|a, b| {
		b.recency().cmp(&a.recency()).then_with(|| b.stars.unwrap_or(0).cmp(&a.stars.unwrap_or(0)))
	});
	unique.truncate(limit);

	unique
}
