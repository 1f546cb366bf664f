//! Tag normalization.
//!
//! Sources disagree on how tags travel: a JSON array, a JSON array encoded as a string, a
//! comma-joined string, a single bare string, or nothing at all. Everything is folded into an
//! ordered list of trimmed, non-empty strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSource {
	List(Vec<String>),
	Text(String),
	Absent,
}

pub fn normalize(source: TagSource) -> Vec<String> {
	match source {
		TagSource::List(items) => clean(items),
		TagSource::Text(text) => normalize_text(&text),
		TagSource::Absent => Vec::new(),
	}
}

/// Normalizes an already-decoded JSON value. Never fails.
pub fn from_json(value: Value) -> Vec<String> {
	match value {
		Value::Null => Vec::new(),
		Value::String(text) => normalize_text(&text),
		Value::Array(items) => clean(items.into_iter().filter_map(element_text).collect()),
		other => clean(vec![other.to_string()]),
	}
}

/// `deserialize_with` adapter for wire types carrying a `tags` field.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;

	Ok(value.map(from_json).unwrap_or_default())
}

fn normalize_text(text: &str) -> Vec<String> {
	if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
		return clean(items.into_iter().filter_map(element_text).collect());
	}
	if text.contains(',') {
		return clean(text.split(',').map(str::to_string).collect());
	}

	clean(vec![text.to_string()])
}

fn element_text(value: Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) => Some(text),
		other => Some(other.to_string()),
	}
}

fn clean(items: Vec<String>) -> Vec<String> {
	items
		.into_iter()
		.filter_map(|item| {
			let trimmed = item.trim();

			if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
		})
		.collect()
}
