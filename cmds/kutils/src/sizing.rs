//! Sizing report of a rendered manifest.
//!
//! Every workload contributes the resources, replicas, image and env of its
//! first container. The report is written as JSON, HTML and CSV; two CSV
//! reports can be compared side by side.

use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use k8s::{
	paths::{CPU, KIND, LIMITS, MEMORY, NAME, REPLICAS, REQUESTS, RESOURCES, TEMPLATE_CONTAINERS},
	resource_value,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use crate::{
	docpath,
	flatten::leaf_text,
	manifest,
	report::{self, fmt_number, Table},
	yaml,
};

const SIZING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<style>
table, th, td {
    border: 1px solid black;
}
</style>
</head>
<body>
<h2>Resources</h2>
<table border="1" cellpadding="5">
    <tr><th>module</th><th colspan="2">limits</th><th colspan="2">requests</th></tr>
    <tr><th></th><th>memory</th><th>cpu</th><th>memory</th><th>cpu</th><th>replicas</th><th>image</th></tr>
{{range .modules}}    <tr>
        <td>{{.module}}</td>
        <td>{{.limits_memory}}</td><td>{{.limits_cpu}}</td>
        <td>{{.requests_memory}}</td><td>{{.requests_cpu}}</td><td>{{.replicas}}</td><td>{{.image}}</td>
    </tr>
{{end}}</table>
</body>
</html>
"#;

const SIZING_CSV: &str = "module,memory_limits,cpu_limits,memory_requests,cpu_requests,replicas
{{range .modules}}{{.module}},{{.memory_limits}},{{.cpu_limits}},{{.memory_requests}},{{.cpu_requests}},{{.replicas}}
{{end}}";

/// Column suffixes used by [`compare`]
pub const LEFT_SUFFIX: &str = "_helm";
pub const RIGHT_SUFFIX: &str = "_kust";

pub struct Sizing {
	manifest_file: PathBuf,
	docs: Vec<Value>,
}

impl Sizing {
	#[instrument(skip_all, fields(path = %manifest_file.display()))]
	pub fn load(manifest_file: &Path) -> Result<Self> {
		Ok(Self {
			manifest_file: manifest_file.to_path_buf(),
			docs: yaml::load_all(manifest_file)?,
		})
	}

	pub fn from_docs(docs: Vec<Value>) -> Self {
		Self {
			manifest_file: PathBuf::new(),
			docs,
		}
	}

	/// Documents with at least one template container
	fn container_docs(&self) -> impl Iterator<Item = &Value> {
		self.docs
			.iter()
			.filter(|doc| docpath::get_non_empty(doc, TEMPLATE_CONTAINERS).is_some())
	}

	/// Resources of the first container of every workload, by container name
	pub fn extract_resources(&self) -> BTreeMap<String, Value> {
		let mut out = BTreeMap::new();
		for doc in self.container_docs() {
			debug!("processing doc kind: {}", doc.get(KIND).map(leaf_text).unwrap_or_default());
			let Some(container) = docpath::get(doc, &format!("{TEMPLATE_CONTAINERS}/0")) else {
				continue;
			};
			let name = docpath::get_non_empty(container, NAME).map_or_else(|| "None".to_string(), leaf_text);
			match docpath::get_non_empty(container, RESOURCES) {
				Some(Value::Object(resources)) => {
					let mut entry = resources.clone();
					if entry.get(REQUESTS).map_or(true, docpath::is_empty) {
						entry.insert(REQUESTS.to_string(), json!({CPU: null, MEMORY: null}));
					}
					entry.insert("replicas".to_string(), docpath::get(doc, REPLICAS).cloned().unwrap_or(Value::Null));
					entry.insert("image".to_string(), container.get("image").cloned().unwrap_or(Value::Null));
					entry.insert("env".to_string(), container.get("env").cloned().unwrap_or(Value::Null));
					out.insert(name, Value::Object(entry));
				}
				_ => {
					debug!("add empty resources for {name}");
					out.insert(name, json!({LIMITS: {}, REQUESTS: {}, "replicas": {}}));
				}
			}
		}
		out
	}

	pub fn extract_volumes(&self) -> BTreeMap<String, Value> {
		manifest::extract_volumes(&self.docs)
	}

	pub fn extract_properties(&self) -> BTreeMap<String, Value> {
		manifest::extract_properties(&self.docs)
	}

	/// Write `<base>.json`, `<base>_properties.json`, `<base>.html` and `<base>.csv` into `save_path`.
	///
	/// Returns the per module resources.
	pub fn save(&self, save_path: &Path, base_name: &str) -> Result<BTreeMap<String, Value>> {
		let output_json = save_path.join(format!("{base_name}.json"));
		let output_props = save_path.join(format!("{base_name}_properties.json"));
		let output_html = save_path.join(format!("{base_name}.html"));
		let output_csv = save_path.join(format!("{base_name}.csv"));

		let metrics = self.extract_resources();
		info!(
			"create sizing from {} to {}",
			self.manifest_file.display(),
			output_json.display()
		);

		let mut with_volumes: Map<String, Value> = metrics.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
		with_volumes.insert("volumes".to_string(), json!(self.extract_volumes()));
		yaml::write_json(&output_json, &yaml::sort_json_keys(Value::Object(with_volumes)), 4)?;
		yaml::write_json(&output_props, &yaml::sort_json_keys(json!(self.extract_properties())), 4)?;

		let html = report::render(SIZING_HTML, &html_context(&metrics))?;
		fs::write(&output_html, html).with_context(|| format!("failed to write {}", output_html.display()))?;
		let csv = report::render(SIZING_CSV, &csv_context(&metrics))?;
		fs::write(&output_csv, csv).with_context(|| format!("failed to write {}", output_csv.display()))?;
		Ok(metrics)
	}
}

/// Cell text as the report shows it: missing keys are blank, null is `None`
fn raw_cell(resources: &Value, path: &str) -> String {
	docpath::get(resources, path).map(leaf_text).unwrap_or_default()
}

fn numeric_cell(resources: &Value, path: &str) -> String {
	docpath::get(resources, path)
		.and_then(resource_value)
		.map(fmt_number)
		.unwrap_or_default()
}

fn html_context(metrics: &BTreeMap<String, Value>) -> Value {
	let modules: Vec<Value> = metrics
		.iter()
		.map(|(module, resources)| {
			let cell = |path: &str| report::escape_html(&raw_cell(resources, path));
			json!({
				"module": report::escape_html(module),
				"limits_memory": cell("limits/memory"),
				"limits_cpu": cell("limits/cpu"),
				"requests_memory": cell("requests/memory"),
				"requests_cpu": cell("requests/cpu"),
				"replicas": cell("replicas"),
				"image": cell("image"),
			})
		})
		.collect();
	json!({"modules": modules})
}

fn csv_context(metrics: &BTreeMap<String, Value>) -> Value {
	let modules: Vec<Value> = metrics
		.iter()
		.map(|(module, resources)| {
			let replicas = match resources.get("replicas") {
				Some(Value::Number(n)) => n.to_string(),
				_ => String::new(),
			};
			json!({
				"module": module,
				"memory_limits": numeric_cell(resources, "limits/memory"),
				"cpu_limits": numeric_cell(resources, "limits/cpu"),
				"memory_requests": numeric_cell(resources, "requests/memory"),
				"cpu_requests": numeric_cell(resources, "requests/cpu"),
				"replicas": replicas,
			})
		})
		.collect();
	json!({"modules": modules})
}

/// Outer join of two sizing CSVs on `module`, sorted by module.
///
/// Columns present in both files get the `_helm` (left) and `_kust` (right) suffixes.
pub fn compare(left: &Table, right: &Table) -> Result<Table> {
	const KEY: &str = "module";
	let key_index = |table: &Table, side: &str| {
		table
			.headers
			.iter()
			.position(|h| h == KEY)
			.with_context(|| format!("{side} table has no `{KEY}` column"))
	};
	let left_key = key_index(left, "left")?;
	let right_key = key_index(right, "right")?;

	let columns = |table: &Table, key: usize, other: &Table, suffix: &str| -> Vec<(usize, String)> {
		table
			.headers
			.iter()
			.enumerate()
			.filter(|(i, _)| *i != key)
			.map(|(i, h)| {
				let shared = other.headers.iter().any(|o| o == h);
				(i, if shared { format!("{h}{suffix}") } else { h.clone() })
			})
			.collect()
	};
	let left_columns = columns(left, left_key, right, LEFT_SUFFIX);
	let right_columns = columns(right, right_key, left, RIGHT_SUFFIX);

	let index = |table: &Table, key: usize| -> BTreeMap<String, Vec<String>> {
		table
			.rows
			.iter()
			.filter_map(|row| row.get(key).map(|k| (k.clone(), row.clone())))
			.collect()
	};
	let left_rows = index(left, left_key);
	let right_rows = index(right, right_key);
	let modules: BTreeSet<&String> = left_rows.keys().chain(right_rows.keys()).collect();

	let mut out = Table::new(
		std::iter::once(KEY.to_string())
			.chain(left_columns.iter().map(|(_, h)| h.clone()))
			.chain(right_columns.iter().map(|(_, h)| h.clone())),
	);
	let cells = |row: Option<&Vec<String>>, columns: &[(usize, String)]| -> Vec<String> {
		columns
			.iter()
			.map(|(i, _)| row.and_then(|r| r.get(*i)).cloned().unwrap_or_default())
			.collect()
	};
	for module in modules {
		let mut row = vec![module.clone()];
		row.extend(cells(left_rows.get(module), &left_columns));
		row.extend(cells(right_rows.get(module), &right_columns));
		out.push(row);
	}
	Ok(out)
}

pub fn compare_files(left: &Path, right: &Path) -> Result<Table> {
	let read = |path: &Path| {
		fs::read_to_string(path)
			.map(|content| report::parse_csv(&content))
			.with_context(|| format!("failed to read {}", path.display()))
	};
	compare(&read(left)?, &read(right)?)
}
