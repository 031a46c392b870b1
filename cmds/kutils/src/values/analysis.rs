//! Analysis of the values files of a Helm charts tree.
//!
//! YAML files are split into values files (name contains `values` or the file
//! sets `resources:`) and the rest (templates). Every values document is
//! flattened so keys can be compared across charts.

use std::{
	collections::{BTreeMap, BTreeSet},
	fmt::Write as _,
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::{
	flatten::{self, dotted, leaf_text, FlatDoc, FlatKey},
	process,
	report::{self, Table},
	yaml,
};

pub const VALUES_FILE_NAME_CONTAINS: &str = "values";
pub const VALUES_FILE_CONTAINS: &str = "resources:";
pub const PLACEHOLDER: &str = ".Values.";
pub const RESOURCES_SEGMENT: &str = "resources";

/// Flattened documents of one values file
#[derive(Debug, Clone)]
pub struct ValuesFile {
	pub path: PathBuf,
	pub docs: Vec<FlatDoc>,
}

impl ValuesFile {
	/// All documents of the file merged, later documents win
	pub fn merged(&self) -> FlatDoc {
		let mut out = FlatDoc::new();
		for doc in &self.docs {
			for (key, value) in doc {
				out.insert(key.clone(), value.clone());
			}
		}
		out
	}
}

/// Resource keys of a single values file
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTable {
	/// Path relative to the analysed folder
	pub rel_path: PathBuf,
	/// `Date:` line of the last commit touching the file
	pub last_modified: String,
	pub rows: BTreeMap<FlatKey, String>,
}

impl ResourceTable {
	pub fn column(&self) -> String {
		self.rel_path.display().to_string()
	}

	pub fn file_name(&self) -> String {
		self.rel_path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	pub fn to_table(&self) -> Table {
		let mut table = Table::new(["key".to_string(), self.column()]);
		for (key, value) in &self.rows {
			table.push([dotted(key), value.clone()]);
		}
		table
	}

	/// `{column: {key: value}}`
	pub fn to_json(&self) -> Value {
		let rows: serde_json::Map<String, Value> = self
			.rows
			.iter()
			.map(|(key, value)| (dotted(key), Value::String(value.clone())))
			.collect();
		let mut out = serde_json::Map::new();
		out.insert(self.column(), Value::Object(rows));
		Value::Object(out)
	}

	/// Distinct key prefixes in front of the `resources` segment
	pub fn ini_sections(&self) -> BTreeSet<String> {
		self.rows
			.keys()
			.filter_map(|key| {
				let idx = key.iter().position(|segment| segment == RESOURCES_SEGMENT)?;
				Some(key[..idx].join("/"))
			})
			.filter(|section| !section.is_empty())
			.collect()
	}

	fn html_header(&self, branch: &str) -> String {
		format!(
			"<ul><li>Branch : {branch}</li>\n<li>Relative path: {}</li>\n<li>Last modified: {}</li>\n</ul>\n",
			self.column(),
			self.last_modified
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
	pub value_docs: usize,
	pub value_files: usize,
	pub non_value_files: usize,
}

pub struct HelmValuesAnalysis {
	folder: PathBuf,
	value_files: BTreeSet<PathBuf>,
	non_value_files: BTreeSet<PathBuf>,
	loaded: Vec<ValuesFile>,
}

impl HelmValuesAnalysis {
	#[instrument(skip_all, fields(folder = %folder.display()))]
	pub fn new(folder: &Path) -> Result<Self> {
		if !folder.is_dir() {
			anyhow::bail!("{} is not a directory", folder.display());
		}
		let (value_files, non_value_files) = classify(folder);
		let files: Vec<&PathBuf> = value_files.iter().collect();
		let mut loaded: Vec<ValuesFile> = files.par_iter().filter_map(|path| load_values_file(path)).collect();
		loaded.sort_by(|a, b| a.path.cmp(&b.path));
		let analysis = Self {
			folder: folder.to_path_buf(),
			value_files,
			non_value_files,
			loaded,
		};
		let summary = analysis.summary();
		info!(
			value_docs = summary.value_docs,
			value_files = summary.value_files,
			non_value_files = summary.non_value_files,
			"values analysis loaded"
		);
		Ok(analysis)
	}

	pub fn folder(&self) -> &Path {
		&self.folder
	}

	pub fn value_files(&self) -> &BTreeSet<PathBuf> {
		&self.value_files
	}

	pub fn non_value_files(&self) -> &BTreeSet<PathBuf> {
		&self.non_value_files
	}

	pub fn loaded(&self) -> &[ValuesFile] {
		&self.loaded
	}

	fn value_docs(&self) -> impl Iterator<Item = &FlatDoc> {
		self.loaded.iter().flat_map(|file| &file.docs)
	}

	pub fn summary(&self) -> Summary {
		Summary {
			value_docs: self.value_docs().count(),
			value_files: self.value_files.len(),
			non_value_files: self.non_value_files.len(),
		}
	}

	/// Sorted unique flattened keys of all values documents
	pub fn value_keys(&self) -> Vec<FlatKey> {
		let keys: BTreeSet<&FlatKey> = self.value_docs().flat_map(|doc| doc.keys()).collect();
		keys.into_iter().cloned().collect()
	}

	/// `key=value` of every key whose dotted form contains `contain`
	pub fn list_keys(&self, contain: &str) -> Vec<String> {
		self.value_docs()
			.flat_map(|doc| doc.iter())
			.filter_map(|(key, value)| {
				let key = dotted(key);
				key.contains(contain).then(|| format!("{key}={}", leaf_text(value)))
			})
			.collect()
	}

	/// Template lines referencing `.Values.`
	pub fn placeholders(&self) -> Vec<String> {
		let mut out = Vec::new();
		for file in &self.non_value_files {
			let content = match fs::read_to_string(file) {
				Ok(content) => content,
				Err(e) => {
					warn!("skipping {}: {e}", file.display());
					continue;
				}
			};
			out.extend(content.lines().filter(|line| line.contains(PLACEHOLDER)).map(str::to_string));
		}
		out
	}

	/// Keys with a `filter` segment, one table per values file
	pub fn resource_tables(&self, filter: &str) -> Vec<ResourceTable> {
		self.loaded
			.iter()
			.map(|file| {
				let rel_path = file.path.strip_prefix(&self.folder).unwrap_or(&file.path).to_path_buf();
				let rows = file
					.merged()
					.into_iter()
					.filter(|(key, _)| key.iter().any(|segment| segment == filter))
					.map(|(key, value)| (key, leaf_text(&value)))
					.collect();
				debug!("resources of {}", rel_path.display());
				ResourceTable {
					last_modified: process::git_last_file_change(&self.folder, &rel_path),
					rel_path,
					rows,
				}
			})
			.collect()
	}

	/// Write `<branch>_resources.html` plus a JSON and an INI file per values file name with resources.
	///
	/// Values files sharing a name in different charts share the JSON and INI
	/// reports, the JSON holds one entry per relative path. Returns the paths written.
	#[instrument(skip_all, fields(branch = %branch, report_folder = %report_folder.display()))]
	pub fn analyze(&self, branch: &str, report_folder: &Path) -> Result<Vec<PathBuf>> {
		let mut tables = self.resource_tables(RESOURCES_SEGMENT);
		tables.sort_by(|a, b| b.rows.len().cmp(&a.rows.len()));
		fs::create_dir_all(report_folder)
			.with_context(|| format!("failed to create {}", report_folder.display()))?;

		let mut by_name: IndexMap<String, (serde_json::Map<String, Value>, BTreeSet<String>)> = IndexMap::new();
		let mut html = String::new();
		for table in tables.iter().filter(|t| !t.rows.is_empty()) {
			html.push_str(&table.html_header(branch));
			html.push_str(&table.to_table().to_html()?);

			let (json, sections) = by_name.entry(table.file_name()).or_default();
			if let Value::Object(entry) = table.to_json() {
				json.extend(entry);
			}
			sections.extend(table.ini_sections());
		}

		let mut written = Vec::new();
		for (name, (json, sections)) in by_name {
			let json_file = report_folder.join(format!("{branch}_{name}.json"));
			yaml::write_json(&json_file, &Value::Object(json), 2)?;
			let ini_file = report_folder.join(format!("{branch}_{name}.ini"));
			fs::write(&ini_file, ini_text(&sections))
				.with_context(|| format!("failed to write {}", ini_file.display()))?;
			written.extend([json_file, ini_file]);
		}
		let html_file = report_folder.join(format!("{branch}_resources.html"));
		fs::write(&html_file, report::html_page(&format!("{branch} resources"), &html))
			.with_context(|| format!("failed to write {}", html_file.display()))?;
		written.push(html_file);
		Ok(written)
	}

	/// Sorted unique `dotted.key=<url-encoded value>` lines
	pub fn properties(&self) -> BTreeSet<String> {
		self.value_docs()
			.flat_map(|doc| doc.iter())
			.map(|(key, value)| format!("{}={}", dotted(key), urlencoding::encode(&leaf_text(value))))
			.collect()
	}

	/// Write [`Self::properties`] to `file`, returning the number of lines
	pub fn to_properties(&self, file: &Path) -> Result<usize> {
		let properties = self.properties();
		info!("writing {} unique key/value pairs to {}", properties.len(), file.display());
		let content: String = properties.iter().map(|line| format!("{line}\n")).collect();
		fs::write(file, content).with_context(|| format!("failed to write {}", file.display()))?;
		Ok(properties.len())
	}
}

/// One empty section per entry
fn ini_text(sections: &BTreeSet<String>) -> String {
	sections.iter().fold(String::new(), |mut out, section| {
		let _ = write!(out, "[{section}]\n\n");
		out
	})
}

/// Split all `*.yaml` files below `folder` into values files and the rest
pub fn classify(folder: &Path) -> (BTreeSet<PathBuf>, BTreeSet<PathBuf>) {
	let mut values = BTreeSet::new();
	let mut others = BTreeSet::new();
	let yaml_files = WalkDir::new(folder)
		.follow_links(true)
		.into_iter()
		.filter_map(|entry| {
			let entry = entry.ok()?;
			let path = entry.path();
			(path.is_file() && path.extension().is_some_and(|ext| ext == "yaml")).then(|| path.to_path_buf())
		});
	for path in yaml_files {
		let by_name = path
			.file_name()
			.is_some_and(|name| name.to_string_lossy().contains(VALUES_FILE_NAME_CONTAINS));
		let by_content = || {
			fs::read_to_string(&path)
				.map(|content| content.contains(VALUES_FILE_CONTAINS))
				.unwrap_or(false)
		};
		if by_name || by_content() {
			values.insert(path);
		} else {
			others.insert(path);
		}
	}
	(values, others)
}

/// Load and flatten a values file. Problems are logged and the file is skipped.
fn load_values_file(path: &Path) -> Option<ValuesFile> {
	let docs = match yaml::load_all(path) {
		Ok(docs) => docs,
		Err(e) => {
			error!("skipping {}: {e:#}", path.display());
			return None;
		}
	};
	debug!("loaded {} docs from {}", docs.len(), path.display());
	let docs = docs
		.into_iter()
		.filter_map(|doc| match doc {
			Value::Object(_) => Some(flatten::flatten(&doc)),
			other => {
				error!("{} contains non dict doc = {other}", path.display());
				None
			}
		})
		.collect();
	Some(ValuesFile {
		path: path.to_path_buf(),
		docs,
	})
}

/// Rebuild a values document from `key=<url-encoded value>` lines. `None` values are dropped.
pub fn properties_to_doc(content: &str) -> Result<Value> {
	let mut flat: BTreeMap<FlatKey, Value> = BTreeMap::new();
	for line in content.lines().filter(|line| !line.trim().is_empty()) {
		let (key, value) = line
			.split_once('=')
			.with_context(|| format!("expected `key=value`, got {line:?}"))?;
		let value = urlencoding::decode(value).with_context(|| format!("invalid url encoding in {line:?}"))?;
		if value == "None" {
			continue;
		}
		flat.insert(key.split('.').map(str::to_string).collect(), Value::String(value.into_owned()));
	}
	Ok(flatten::unflatten(flat))
}

pub fn from_properties(file: &Path) -> Result<Value> {
	let content = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
	properties_to_doc(&content).with_context(|| format!("failed to parse {}", file.display()))
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	fn charts() -> TempDir {
		let temp = TempDir::new().unwrap();
		let chart = temp.path().join("charts").join("dpm");
		fs::create_dir_all(chart.join("templates")).unwrap();
		fs::write(
			chart.join("values.yaml"),
			indoc! {"
				dpm:
				  replicas: 1
				  resources:
				    limits:
				      cpu: 2
				      memory: 4Gi
				  javaOpts: -Xmx2g -Dfoo=a&b
			"},
		)
		.unwrap();
		fs::write(
			chart.join("sizing.yaml"),
			indoc! {"
				dpe:
				  resources:
				    requests:
				      memory: 1Gi
				---
				- not a dict
			"},
		)
		.unwrap();
		fs::write(
			chart.join("templates").join("deployment.yaml"),
			indoc! {"
				kind: Deployment
				spec:
				  replicas: {{ .Values.dpm.replicas }}
				  image: static
			"},
		)
		.unwrap();
		fs::write(chart.join("broken-values.yaml"), "a: [1, 2\n").unwrap();
		temp
	}

	#[test]
	fn test_classify_by_name_and_content() {
		let temp = charts();
		let analysis = HelmValuesAnalysis::new(temp.path()).unwrap();
		assert_eq!(
			analysis.summary(),
			Summary {
				value_docs: 2,
				value_files: 3,
				non_value_files: 1,
			}
		);
		assert_eq!(analysis.loaded().len(), 2);
	}

	#[test]
	fn test_keys_and_placeholders() {
		let temp = charts();
		let analysis = HelmValuesAnalysis::new(temp.path()).unwrap();
		let keys: Vec<String> = analysis.value_keys().iter().map(|k| dotted(k)).collect();
		assert_eq!(
			keys,
			[
				"dpe.resources.requests.memory",
				"dpm.javaOpts",
				"dpm.replicas",
				"dpm.resources.limits.cpu",
				"dpm.resources.limits.memory",
			]
		);
		assert_eq!(analysis.list_keys("limits.cpu"), ["dpm.resources.limits.cpu=2"]);
		assert_eq!(analysis.placeholders(), ["  replicas: {{ .Values.dpm.replicas }}"]);
	}

	#[test]
	fn test_analyze_writes_reports() {
		let temp = charts();
		let analysis = HelmValuesAnalysis::new(temp.path()).unwrap();
		let report = temp.path().join("report");
		let written = analysis.analyze("main", &report).unwrap();
		assert_eq!(written.len(), 5);

		let json: Value =
			serde_json::from_str(&fs::read_to_string(report.join("main_values.yaml.json")).unwrap()).unwrap();
		assert_eq!(
			json,
			json!({"charts/dpm/values.yaml": {
				"dpm.resources.limits.cpu": "2",
				"dpm.resources.limits.memory": "4Gi",
			}})
		);
		assert_eq!(fs::read_to_string(report.join("main_sizing.yaml.ini")).unwrap(), "[dpe]\n\n");

		let html = fs::read_to_string(report.join("main_resources.html")).unwrap();
		assert!(html.contains("<li>Relative path: charts/dpm/values.yaml</li>"));
		// the larger table comes first
		assert!(html.find("charts/dpm/values.yaml").unwrap() < html.find("charts/dpm/sizing.yaml").unwrap());
	}

	#[test]
	fn test_analyze_groups_values_files_sharing_a_name() {
		let temp = charts();
		let mmm = temp.path().join("charts").join("mmm");
		fs::create_dir_all(&mmm).unwrap();
		fs::write(mmm.join("values.yaml"), "mmmBe:\n  resources:\n    limits:\n      memory: 3Gi\n").unwrap();
		let analysis = HelmValuesAnalysis::new(temp.path()).unwrap();
		let report = temp.path().join("report");
		let written = analysis.analyze("main", &report).unwrap();

		let unique: BTreeSet<&PathBuf> = written.iter().collect();
		assert_eq!(unique.len(), written.len());
		assert_eq!(written.len(), 5);

		let json: Value =
			serde_json::from_str(&fs::read_to_string(report.join("main_values.yaml.json")).unwrap()).unwrap();
		assert_eq!(json["charts/dpm/values.yaml"]["dpm.resources.limits.memory"], json!("4Gi"));
		assert_eq!(json["charts/mmm/values.yaml"]["mmmBe.resources.limits.memory"], json!("3Gi"));
		assert_eq!(
			fs::read_to_string(report.join("main_values.yaml.ini")).unwrap(),
			"[dpm]\n\n[mmmBe]\n\n"
		);
	}

	#[test]
	fn test_properties_round_trip() {
		let temp = charts();
		let analysis = HelmValuesAnalysis::new(temp.path()).unwrap();
		let file = temp.path().join("values.properties");
		assert_eq!(analysis.to_properties(&file).unwrap(), 5);
		let content = fs::read_to_string(&file).unwrap();
		assert!(content.contains("dpm.javaOpts=-Xmx2g%20-Dfoo%3Da%26b\n"));

		let doc = from_properties(&file).unwrap();
		assert_eq!(doc["dpm"]["javaOpts"], json!("-Xmx2g -Dfoo=a&b"));
		assert_eq!(doc["dpm"]["resources"]["limits"]["memory"], json!("4Gi"));
	}

	#[test]
	fn test_properties_to_doc_drops_none() {
		let doc = properties_to_doc("a.b=None\na.c=1\n\n").unwrap();
		assert_eq!(doc, json!({"a": {"c": "1"}}));
		assert!(properties_to_doc("no separator").is_err());
	}
}
