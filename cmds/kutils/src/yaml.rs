//! YAML and JSON file helpers.
//!
//! Every document is handled as a `serde_json::Value` so the rest of the crate
//! works on a single tree type. Object keys keep their insertion order unless
//! explicitly sorted.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::instrument;

/// Parse all documents of a YAML stream. Empty documents are skipped.
///
/// Duplicate keys are accepted, the last occurrence wins.
pub fn load_all_str(content: &str) -> Result<Vec<JsonValue>, serde_yaml::Error> {
	let mut docs = Vec::new();
	for document in serde_yaml::Deserializer::from_str(content) {
		let value = JsonValue::deserialize(document)?;
		if !value.is_null() {
			docs.push(value);
		}
	}
	Ok(docs)
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_all(path: &Path) -> Result<Vec<JsonValue>> {
	let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
	load_all_str(&content).with_context(|| format!("failed to parse YAML in {}", path.display()))
}

/// Sort all JSON object keys recursively.
pub fn sort_json_keys(value: JsonValue) -> JsonValue {
	match value {
		JsonValue::Object(map) => {
			let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			JsonValue::Object(entries.into_iter().map(|(k, v)| (k, sort_json_keys(v))).collect())
		}
		JsonValue::Array(arr) => JsonValue::Array(arr.into_iter().map(sort_json_keys).collect()),
		other => other,
	}
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_yaml::Error> {
	serde_yaml::to_string(value)
}

/// JSON with the given indentation width.
pub fn to_json_indented<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String, serde_json::Error> {
	let indent = " ".repeat(indent);
	let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
	let mut out = Vec::new();
	let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
	value.serialize(&mut ser)?;
	Ok(String::from_utf8_lossy(&out).into_owned())
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
	let content = to_yaml(value).with_context(|| format!("failed to serialize {}", path.display()))?;
	fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, indent: usize) -> Result<()> {
	let content = to_json_indented(value, indent).with_context(|| format!("failed to serialize {}", path.display()))?;
	fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
