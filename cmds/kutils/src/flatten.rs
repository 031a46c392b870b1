//! Flattening nested documents into path keys and back.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Key of a flattened document: one element per nesting level
pub type FlatKey = Vec<String>;
pub type FlatDoc = IndexMap<FlatKey, Value>;

/// Flatten nested objects. Arrays, scalars and empty objects are leaves.
pub fn flatten(doc: &Value) -> FlatDoc {
	let mut out = FlatDoc::new();
	let mut prefix = Vec::new();
	flatten_into(doc, &mut prefix, &mut out);
	out
}

fn flatten_into(value: &Value, prefix: &mut FlatKey, out: &mut FlatDoc) {
	match value {
		Value::Object(map) if !map.is_empty() => {
			for (key, child) in map {
				prefix.push(key.clone());
				flatten_into(child, prefix, out);
				prefix.pop();
			}
		}
		leaf => {
			out.insert(prefix.clone(), leaf.clone());
		}
	}
}

/// Rebuild a nested document. A later key wins when paths collide.
pub fn unflatten(flat: impl IntoIterator<Item = (FlatKey, Value)>) -> Value {
	let mut root = Value::Object(Map::new());
	for (key, value) in flat {
		let path = key.join("/");
		crate::docpath::new(&mut root, &path, value);
	}
	root
}

/// `a.b.c` form of a key
pub fn dotted(key: &[String]) -> String {
	key.join(".")
}

/// Text of a leaf value as it appears in reports: strings unquoted, everything else as JSON
pub fn leaf_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => "None".to_string(),
		other => other.to_string(),
	}
}
