//! Slash separated paths (`spec/template/spec/containers`) over JSON documents.

use serde_json::{Map, Value};
use tracing::{info, warn};

fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|s| !s.is_empty())
}

/// Look up a path. Numeric segments index into arrays.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
	segments(path).try_fold(doc, |current, segment| match current {
		Value::Object(map) => map.get(segment),
		Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get(i)),
		_ => None,
	})
}

/// Like [`get`], but treats null and empty strings, arrays and objects as missing.
pub fn get_non_empty<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
	get(doc, path).filter(|v| !is_empty(v))
}

pub fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		Value::Array(a) => a.is_empty(),
		Value::Object(o) => o.is_empty(),
		_ => false,
	}
}

/// Set `value` at `path`, creating intermediate objects. Anything in the way is replaced.
pub fn new(doc: &mut Value, path: &str, value: Value) {
	let parts: Vec<&str> = segments(path).collect();
	let Some((last, parents)) = parts.split_last() else {
		*doc = value;
		return;
	};

	let mut current = doc;
	for segment in parents {
		current = ensure_object(current)
			.entry((*segment).to_string())
			.or_insert_with(|| Value::Object(Map::new()));
	}
	ensure_object(current).insert((*last).to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
	if !value.is_object() {
		*value = Value::Object(Map::new());
	}
	let Value::Object(map) = value else {
		unreachable!("replaced by an object above")
	};
	map
}

/// Deep merge `src` into `dst`: objects merge key by key, arrays are appended,
/// anything else is replaced.
pub fn merge(dst: &mut Value, src: Value) {
	match (dst, src) {
		(Value::Object(dst_map), Value::Object(src_map)) => {
			for (key, src_value) in src_map {
				match dst_map.get_mut(&key) {
					Some(dst_value) => merge(dst_value, src_value),
					None => {
						dst_map.insert(key, src_value);
					}
				}
			}
		}
		(Value::Array(dst_arr), Value::Array(src_arr)) => dst_arr.extend(src_arr),
		(dst, src) => *dst = src,
	}
}

/// String booleans (`"True"`, `"false"`) become real booleans.
pub fn str_bool(value: Value) -> Value {
	match value {
		Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
		Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
		other => other,
	}
}

/// Merge a property into a values document.
///
/// Null values are skipped. An existing object at `path` is deep merged with an
/// object value, otherwise the value is created (replacing whatever was there).
pub fn merge_at(doc: &mut Value, path: &str, value: Option<Value>) {
	let Some(value) = value.filter(|v| !v.is_null()) else {
		return;
	};
	let value = str_bool(value);

	let existing_object = matches!(get(doc, path), Some(Value::Object(_)));
	if existing_object && value.is_object() {
		info!("{path} found, merge {value}");
		if let Some(existing) = get_mut(doc, path) {
			merge(existing, value);
		}
		return;
	}
	if get(doc, path).is_none() {
		warn!("{path} not found, create new with value {value}");
	}
	new(doc, path, value);
}

pub fn get_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
	segments(path).try_fold(doc, |current, segment| match current {
		Value::Object(map) => map.get_mut(segment),
		Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get_mut(i)),
		_ => None,
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_get_through_arrays() {
		let doc = json!({"spec": {"containers": [{"name": "app"}, {"name": "sidecar"}]}});
		assert_eq!(get(&doc, "spec/containers/1/name"), Some(&json!("sidecar")));
		assert_eq!(get(&doc, "spec/containers/2/name"), None);
		assert_eq!(get(&doc, "spec/replicas"), None);
		assert_eq!(get(&doc, ""), Some(&doc));
	}

	#[test]
	fn test_get_non_empty() {
		let doc = json!({"a": [], "b": {}, "c": "", "d": 0});
		assert_eq!(get_non_empty(&doc, "a"), None);
		assert_eq!(get_non_empty(&doc, "b"), None);
		assert_eq!(get_non_empty(&doc, "c"), None);
		assert_eq!(get_non_empty(&doc, "d"), Some(&json!(0)));
	}

	#[test]
	fn test_new_creates_and_replaces() {
		let mut doc = json!({"storage": "none"});
		new(&mut doc, "storage/tmp/sizeLimit", json!("1Gi"));
		new(&mut doc, "replicas", json!(2));
		assert_eq!(doc, json!({"storage": {"tmp": {"sizeLimit": "1Gi"}}, "replicas": 2}));
	}

	#[test]
	fn test_merge_objects_and_arrays() {
		let mut doc = json!({"a": {"x": 1, "list": [1]}, "b": 1});
		merge(&mut doc, json!({"a": {"y": 2, "list": [2]}, "b": {"z": 3}}));
		assert_eq!(doc, json!({"a": {"x": 1, "list": [1, 2], "y": 2}, "b": {"z": 3}}));
	}

	#[test]
	fn test_merge_at() {
		let mut doc = json!({"dpm": {"enabled": true}});
		merge_at(&mut doc, "dpm", Some(json!({"replicas": 2})));
		merge_at(&mut doc, "dpe/enabled", Some(json!("False")));
		merge_at(&mut doc, "dpe/javaOpts", None);
		merge_at(&mut doc, "dpe/replicas", Some(Value::Null));
		assert_eq!(doc, json!({"dpm": {"enabled": true, "replicas": 2}, "dpe": {"enabled": false}}));
	}

	#[test]
	fn test_merge_at_replaces_scalar() {
		let mut doc = json!({"global": {"hostname": "old"}});
		merge_at(&mut doc, "global/hostname", Some(json!("new")));
		assert_eq!(doc, json!({"global": {"hostname": "new"}}));
	}
}
