//! Helm values generated from the sizing repository.
//!
//! `sizings.ini` maps a sizing name to the INI files describing it, every
//! section of those files is a chart component (`dpm`, `mmmBe`,
//! `termSuggestions/api`, ...). `modules.ini` maps a module set name to the
//! components which are enabled, every other component is disabled.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use k8s::{
	paths::{CPU, LIMITS, MEMORY, REQUESTS, RESOURCES},
	ContainerResources,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
	docpath,
	ini::{split_strip, Ini, SizingConfigError},
	process,
	report::fmt_number,
	values::analysis::HelmValuesAnalysis,
	yaml,
};

pub const SIZINGS_SECTION: &str = "sizings";
pub const MODULES_SECTION: &str = "modules";

pub const EXTRA_ENV: &str = "extraEnv";
pub const EXTRA_PROPERTIES: &str = "extraProperties";
pub const COMMON_EXTRA_ENV: &str = "commonExtraEnv";
pub const COMMON_EXTRA_ENV_ENABLED: &str = "commonExtraEnvEnabled";
pub const EXCLUDE_PODS_COMMON_EXTRA_ENV: &str = "excludePodsCommonExtraEnv";
pub const JAVA_OPTS: &str = "javaOpts";
pub const REPLICAS: &str = "replicas";
pub const STORAGE_SIZE_LIMIT: &str = "storage.tmp.sizeLimit";

/// Separator of extra properties and extra env vars. Values may contain `,`.
pub const SPLIT_BY: char = ';';

#[derive(Debug)]
pub struct HelmValuesFile {
	pub sizing: String,
	config: Ini,
	/// Files of the sizing, relative to the sizing folder
	pub sizing_ini_files: Vec<PathBuf>,
	/// Every component of the sizing
	pub sizing_sections: Vec<String>,
	pub enabled_modules: Vec<String>,
	pub disabled_modules: Vec<String>,
	pub values_doc: Value,
}

impl HelmValuesFile {
	#[instrument(skip_all, fields(sizing_folder = %sizing_folder.display(), sizing = %sizing, modules = %modules))]
	pub fn new(sizing_folder: &Path, sizing: &str, modules: &str) -> Result<Self, SizingConfigError> {
		let mut config = Ini::new();
		config.read_file(&sizing_folder.join(format!("{SIZINGS_SECTION}.ini")))?;
		let sizing_files = require(&config, SIZINGS_SECTION, sizing)?;
		let sizing_ini_files: Vec<PathBuf> = sizing_files
			.split(',')
			.map(str::trim)
			.filter(|f| !f.is_empty())
			.map(PathBuf::from)
			.collect();
		let absolute: Vec<PathBuf> = sizing_ini_files.iter().map(|f| sizing_folder.join(f)).collect();
		config.read_files(&absolute)?;
		let sizing_sections: Vec<String> = config
			.sections()
			.filter(|s| *s != SIZINGS_SECTION)
			.map(str::to_string)
			.collect();

		let mut modules_config = Ini::new();
		modules_config.read_file(&sizing_folder.join(format!("{MODULES_SECTION}.ini")))?;
		let mut enabled_modules: Vec<String> = split_strip(&require(&modules_config, MODULES_SECTION, modules)?, ',')
			.into_iter()
			.filter(|m| !m.is_empty())
			.collect();
		enabled_modules.sort();
		let disabled_modules = disabled_modules(&sizing_sections, &enabled_modules);
		debug!(?enabled_modules, ?disabled_modules, "modules resolved");

		Ok(Self {
			sizing: sizing.to_string(),
			config,
			sizing_ini_files,
			sizing_sections,
			enabled_modules,
			disabled_modules,
			values_doc: Value::Object(Map::new()),
		})
	}

	fn sizing_value(&self, section: &str, option: &str) -> Result<Option<String>, SizingConfigError> {
		self.config.get(section, option)
	}

	/// Set `enabled` on every level of each module path
	pub fn set_modules(&mut self, modules: &[String], enabled: bool) {
		for module in modules {
			let parts: Vec<&str> = module.split('/').collect();
			for i in 1..=parts.len() {
				let path = parts[..i].join("/");
				docpath::merge_at(&mut self.values_doc, &path, Some(json!({"enabled": enabled})));
			}
		}
	}

	/// `requests` and `limits` of a component. CPU limits are only set when configured.
	pub fn resources(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		let value = |key: &str| -> Result<Value, SizingConfigError> {
			Ok(self.sizing_value(section, key)?.map_or(Value::Null, Value::String))
		};
		let mut limits = Map::new();
		if let Some(cpu_limits) = self.sizing_value(section, "cpu.limits")?.filter(|v| !v.is_empty()) {
			limits.insert(CPU.to_string(), Value::String(cpu_limits));
		}
		limits.insert(MEMORY.to_string(), value("memory.limits")?);
		Ok(Some(json!({
			REQUESTS: {CPU: value("cpu.requests")?, MEMORY: value("memory.requests")?},
			LIMITS: limits,
		})))
	}

	/// `extraProperties` as a typed map, `None` when not configured
	pub fn extra_properties_map(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		let parts = self
			.sizing_value(section, EXTRA_PROPERTIES)?
			.map(|v| split_strip(&v, SPLIT_BY))
			.unwrap_or_default();
		Ok(properties_map(&parts))
	}

	/// Extra env of the component, prefixed by the common env vars when enabled for it
	pub fn extra_env(&self, section: &str) -> Result<Option<String>, SizingConfigError> {
		let extra_envs = self.sizing_value(section, EXTRA_ENV)?;
		let excluded = self
			.sizing_value(section, EXCLUDE_PODS_COMMON_EXTRA_ENV)?
			.is_some_and(|v| split_strip(&v, SPLIT_BY).iter().any(|pod| pod == section));
		let enabled = self.config.get_bool(section, COMMON_EXTRA_ENV_ENABLED)?.unwrap_or(false);
		if excluded || !enabled {
			return Ok(extra_envs);
		}
		let Some(common_envs) = self.sizing_value(section, COMMON_EXTRA_ENV)? else {
			return Ok(extra_envs);
		};
		Ok(Some(match extra_envs {
			Some(extra) => format!("{common_envs}{SPLIT_BY}{extra}"),
			None => common_envs,
		}))
	}

	pub fn extra_envs(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		Ok(self.extra_env(section)?.map(|v| process_extra_envs(&v)))
	}

	pub fn java_opts(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		Ok(self.sizing_value(section, JAVA_OPTS)?.map(Value::String))
	}

	pub fn replicas(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		Ok(self.sizing_value(section, REPLICAS)?.map(|v| int_or_string(&v)))
	}

	pub fn storage_size_limit(&self, section: &str) -> Result<Option<Value>, SizingConfigError> {
		Ok(self.sizing_value(section, STORAGE_SIZE_LIMIT)?.map(Value::String))
	}

	fn set_sizing_path<F>(&mut self, rel_path: &str, value_of: F) -> Result<(), SizingConfigError>
	where
		F: Fn(&Self, &str) -> Result<Option<Value>, SizingConfigError>,
	{
		let sections = self.sizing_sections.clone();
		for section in &sections {
			debug!("setting values for {section}/{rel_path}");
			let value = value_of(self, section)?;
			docpath::merge_at(&mut self.values_doc, &format!("{section}/{rel_path}"), value);
		}
		Ok(())
	}

	/// Fill the values document: module switches first, then every sizing option of every component.
	pub fn set_all_sizing_paths(&mut self) -> Result<(), SizingConfigError> {
		let enabled = self.enabled_modules.clone();
		let disabled = self.disabled_modules.clone();
		self.set_modules(&enabled, true);
		self.set_modules(&disabled, false);
		self.set_sizing_path(RESOURCES, Self::resources)?;
		self.set_sizing_path(EXTRA_PROPERTIES, Self::extra_properties_map)?;
		self.set_sizing_path(EXTRA_ENV, Self::extra_envs)?;
		self.set_sizing_path(JAVA_OPTS, Self::java_opts)?;
		self.set_sizing_path(REPLICAS, Self::replicas)?;
		self.set_sizing_path("storage/tmp/sizeLimit", Self::storage_size_limit)?;
		Ok(())
	}

	pub fn dump_values_file(&self, dump_file: &Path) -> Result<()> {
		info!("dumping values to {}", dump_file.display());
		yaml::write_yaml(dump_file, &self.values_doc)
	}

	/// Options of a section (inherited `DEFAULT` options included) as a nested document.
	///
	/// Dotted keys become paths. CPU and memory keys go under `resources`, or are
	/// reversed (`memory.limits` to `limits/memory`) for application templates.
	pub fn add_section(&self, section: &str, app_template: bool) -> Result<Value, SizingConfigError> {
		let mut section_doc = Value::Object(Map::new());
		for (option, raw) in self.config.options(section)? {
			let mut key = option.replace('.', "/");
			let value = if key == EXTRA_PROPERTIES {
				properties_map(&split_strip(&raw, SPLIT_BY))
			} else if key == EXTRA_ENV {
				Some(process_extra_envs(&raw))
			} else if key.contains(CPU) || key.contains(MEMORY) {
				key = if app_template {
					key.rsplit('/').collect::<Vec<_>>().join("/")
				} else {
					format!("{RESOURCES}/{key}")
				};
				Some(Value::String(raw))
			} else if key.contains(REPLICAS) {
				Some(int_or_string(&raw))
			} else {
				Some(Value::String(raw))
			};
			docpath::merge_at(&mut section_doc, &key, value);
		}
		Ok(section_doc)
	}

	/// Every component of the sizing as written by [`Self::add_section`]
	pub fn sizing_doc(&self, app_template: bool) -> Result<Value, SizingConfigError> {
		let mut doc = Value::Object(Map::new());
		for section in &self.sizing_sections {
			let section_doc = self.add_section(section, app_template)?;
			docpath::merge_at(&mut doc, section, Some(section_doc));
		}
		Ok(doc)
	}

	/// Write `<sizing>_ini_sizing.yaml` and `.json` into `folder`
	pub fn ini_yaml(&self, folder: &Path) -> Result<(PathBuf, PathBuf)> {
		let doc = self.sizing_doc(false)?;
		let sizing_yaml = folder.join(format!("{}_ini_sizing.yaml", self.sizing));
		let sizing_json = folder.join(format!("{}_ini_sizing.json", self.sizing));
		info!("writing {} and {}", sizing_yaml.display(), sizing_json.display());
		yaml::write_yaml(&sizing_yaml, &doc)?;
		yaml::write_json(&sizing_json, &doc, 2)?;
		Ok((sizing_yaml, sizing_json))
	}

	/// Normalized resources of the selected components scaled by the given factors,
	/// written to `<sizing>_<cpu>x_cpu_<mem>x_mem.yaml`.
	pub fn multiply_resources(
		&self,
		folder: &Path,
		multiply_cpu: f64,
		multiply_mem: f64,
		components: &[String],
	) -> Result<PathBuf> {
		let mut out = Map::new();
		for component in self.sizing_sections.iter().filter(|s| components.contains(s)) {
			let Some(resources) = self.resources(component)? else {
				continue;
			};
			let normalized = ContainerResources::normalize(&resources, multiply_cpu, multiply_mem);
			out.insert(component.clone(), json!({RESOURCES: normalized.to_value()}));
		}
		let file = folder.join(format!(
			"{}_{}x_cpu_{}x_mem.yaml",
			self.sizing,
			fmt_number(multiply_cpu),
			fmt_number(multiply_mem)
		));
		yaml::write_yaml(&file, &Value::Object(out))?;
		Ok(file)
	}
}

fn require(config: &Ini, section: &str, option: &str) -> Result<String, SizingConfigError> {
	config.get(section, option)?.ok_or_else(|| SizingConfigError::NoOption {
		section: section.to_string(),
		option: option.to_string(),
	})
}

/// Sizing sections not covered by any enabled module.
///
/// A section stays enabled when an enabled module starts with it, so
/// `postgresExporter/serviceMonitor` keeps `postgresExporter` enabled.
pub fn disabled_modules(sizing_sections: &[String], enabled_modules: &[String]) -> Vec<String> {
	let mut disabled: Vec<String> = sizing_sections
		.iter()
		.filter(|section| !enabled_modules.iter().any(|m| m.starts_with(section.as_str())))
		.cloned()
		.collect();
	disabled.sort();
	disabled
}

/// Integers, floats and booleans keep their type so YAML does not quote them
pub fn typed_value(value: &str) -> Value {
	if let Ok(i) = value.parse::<i64>() {
		return Value::from(i);
	}
	if let Ok(f) = value.parse::<f64>() {
		if f.is_finite() {
			return Value::from(f);
		}
	}
	match value.to_lowercase().as_str() {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		_ => Value::String(value.to_string()),
	}
}

fn int_or_string(value: &str) -> Value {
	value
		.trim()
		.parse::<i64>()
		.map_or_else(|_| Value::String(value.to_string()), Value::from)
}

/// `key=value` parts as a typed map, `None` when there are none
pub fn properties_map(parts: &[String]) -> Option<Value> {
	let map: Map<String, Value> = parts
		.iter()
		.filter(|part| !part.is_empty())
		.map(|part| match part.split_once('=') {
			Some((key, value)) => (key.to_string(), typed_value(value)),
			None => (part.clone(), Value::Null),
		})
		.collect();
	(!map.is_empty()).then_some(Value::Object(map))
}

/// `A=1;B=2` as `[{name: A, value: "1"}, {name: B, value: "2"}]`
pub fn process_extra_envs(value: &str) -> Value {
	let envs: Vec<Value> = split_strip(value, SPLIT_BY)
		.iter()
		.filter(|part| !part.is_empty())
		.filter_map(|part| match part.split_once('=') {
			Some((name, value)) => Some(json!({"name": name, "value": value})),
			None => {
				warn!("ignoring extra env without a value: {part}");
				None
			}
		})
		.collect();
	Value::Array(envs)
}

/// Write per component application templates for several sizings.
///
/// Each component gets `templates/services/<component>/sizing/<last>.yaml|json`
/// below `out`, holding the component sections of every sizing.
pub fn app_templates(sizing_folder: &Path, sizings: &[String], modules: &str, out: &Path) -> Result<Vec<PathBuf>> {
	let mut by_section: IndexMap<String, Map<String, Value>> = IndexMap::new();
	for sizing in sizings {
		let values_file = HelmValuesFile::new(sizing_folder, sizing, modules)?;
		for section in &values_file.sizing_sections {
			by_section
				.entry(section.clone())
				.or_default()
				.insert(sizing.clone(), values_file.add_section(section, true)?);
		}
	}

	let mut written = Vec::new();
	for (section, sizing) in by_section {
		let folder = out.join("templates").join("services").join(&section).join("sizing");
		fs::create_dir_all(&folder).with_context(|| format!("failed to create {}", folder.display()))?;
		let last = split_strip(&section, '/').pop().unwrap_or_default();
		let data = json!({
			"chartRootKey": section.replace('/', "."),
			"default": {},
			"sizing": sizing,
		});
		info!("save {section}");
		let yaml_file = folder.join(format!("{last}.yaml"));
		let json_file = folder.join(format!("{last}.json"));
		yaml::write_yaml(&yaml_file, &data)?;
		yaml::write_json(&json_file, &data, 2)?;
		written.extend([yaml_file, json_file]);
	}
	Ok(written)
}

/// Result of [`sizing_report`]
#[derive(Debug, Clone)]
pub struct SizingReport {
	pub report_folder: PathBuf,
	pub values_file: PathBuf,
	pub written: Vec<PathBuf>,
}

/// Generate `<sizing>-values.yaml` into
/// `<output_root>/generated/<branch>/<sizing>/<timestamp>/` and analyse it.
pub fn sizing_report(
	sizing_folder: &Path,
	output_root: &Path,
	branch: &str,
	sizing: &str,
	modules: &str,
) -> Result<SizingReport> {
	let mut values_file = HelmValuesFile::new(sizing_folder, sizing, modules)?;
	let report_folder = output_root
		.join("generated")
		.join(branch)
		.join(sizing)
		.join(process::time_stamp());
	info!("report: {}", report_folder.display());
	fs::create_dir_all(&report_folder).with_context(|| format!("failed to create {}", report_folder.display()))?;

	values_file.set_all_sizing_paths()?;
	let dump_file = report_folder.join(format!("{sizing}-values.yaml"));
	values_file.dump_values_file(&dump_file)?;

	let analysis = HelmValuesAnalysis::new(&report_folder)?;
	let written = analysis.analyze(branch, &report_folder)?;
	Ok(SizingReport {
		report_folder,
		values_file: dump_file,
		written,
	})
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use k8s::GIBS;
	use rstest::rstest;
	use tempfile::TempDir;

	use super::*;

	fn sizing_folder() -> TempDir {
		let temp = TempDir::new().unwrap();
		let dir = temp.path();
		fs::write(
			dir.join("sizings.ini"),
			indoc! {"
				[sizings]
				perf_standard = default/performance.ini, perf/standard.ini
				broken = missing.ini
			"},
		)
		.unwrap();
		fs::write(
			dir.join("modules.ini"),
			indoc! {"
				[modules]
				basic = mmmBe, dpm , postgresExporter/serviceMonitor
			"},
		)
		.unwrap();
		fs::create_dir_all(dir.join("default")).unwrap();
		fs::create_dir_all(dir.join("perf")).unwrap();
		fs::write(
			dir.join("default").join("performance.ini"),
			indoc! {"
				[DEFAULT]
				commonExtraEnv = TZ=UTC
				commonExtraEnvEnabled = true
				excludePodsCommonExtraEnv = dpe; postgresExporter
				heap = 2g

				[mmmBe]
				cpu.requests = 500m
				memory.requests = 1Gi
				memory.limits = 2Gi
				javaOpts = -Xmx${heap}
				replicas = 2

				[dpm]
				cpu.requests = 1
				cpu.limits = 2
				memory.limits = 4Gi
				extraProperties = a.b=1; c=true ;d=0.5; url=http://x?y=z
				extraEnv = JAVA_TOOL=x

				[dpe]
				extraEnv = A=1
				storage.tmp.sizeLimit = 10Gi

				[postgresExporter]
				replicas = 1
			"},
		)
		.unwrap();
		fs::write(dir.join("perf").join("standard.ini"), "[mmmBe]\nreplicas = 3\n").unwrap();
		temp
	}

	fn values_file(dir: &Path) -> HelmValuesFile {
		HelmValuesFile::new(dir, "perf_standard", "basic").unwrap()
	}

	#[test]
	fn test_modules_resolution() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		assert_eq!(v.sizing_sections, ["mmmBe", "dpm", "dpe", "postgresExporter"]);
		assert_eq!(v.enabled_modules, ["dpm", "mmmBe", "postgresExporter/serviceMonitor"]);
		assert_eq!(v.disabled_modules, ["dpe"]);
	}

	#[test]
	fn test_missing_configuration() {
		let temp = sizing_folder();
		assert_matches!(
			HelmValuesFile::new(temp.path(), "unknown", "basic"),
			Err(SizingConfigError::NoOption { .. })
		);
		assert_matches!(
			HelmValuesFile::new(temp.path(), "broken", "basic"),
			Err(SizingConfigError::MissingFile(_))
		);
		assert_matches!(
			HelmValuesFile::new(temp.path(), "perf_standard", "unknown"),
			Err(SizingConfigError::NoOption { .. })
		);
	}

	#[test]
	fn test_resources() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		assert_eq!(
			v.resources("mmmBe").unwrap(),
			Some(json!({"requests": {"cpu": "500m", "memory": "1Gi"}, "limits": {"memory": "2Gi"}}))
		);
		assert_eq!(
			v.resources("dpe").unwrap(),
			Some(json!({"requests": {"cpu": null, "memory": null}, "limits": {"memory": null}}))
		);
		assert_eq!(v.resources("dpm").unwrap().unwrap()["limits"]["cpu"], json!("2"));
	}

	#[test]
	fn test_extra_properties_are_typed() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		assert_eq!(
			v.extra_properties_map("dpm").unwrap(),
			Some(json!({"a.b": 1, "c": true, "d": 0.5, "url": "http://x?y=z"}))
		);
		assert_eq!(v.extra_properties_map("mmmBe").unwrap(), None);
	}

	#[test]
	fn test_extra_envs_with_common() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		assert_eq!(
			v.extra_envs("dpm").unwrap(),
			Some(json!([{"name": "TZ", "value": "UTC"}, {"name": "JAVA_TOOL", "value": "x"}]))
		);
		assert_eq!(v.extra_envs("mmmBe").unwrap(), Some(json!([{"name": "TZ", "value": "UTC"}])));
		// excluded pod keeps its own env only
		assert_eq!(v.extra_envs("dpe").unwrap(), Some(json!([{"name": "A", "value": "1"}])));
		assert_eq!(v.extra_envs("postgresExporter").unwrap(), None);
	}

	#[test]
	fn test_common_env_excluded_pods_are_semicolon_separated() {
		let temp = TempDir::new().unwrap();
		let dir = temp.path();
		fs::write(dir.join("sizings.ini"), "[sizings]\nsmall = small.ini\n").unwrap();
		fs::write(dir.join("modules.ini"), "[modules]\nall = dpe, postgresExporter, dpm\n").unwrap();
		fs::write(
			dir.join("small.ini"),
			indoc! {"
				[DEFAULT]
				commonExtraEnv = TZ=UTC
				commonExtraEnvEnabled = true
				excludePodsCommonExtraEnv = dpe;postgresExporter

				[dpe]
				extraEnv = A=1

				[postgresExporter]
				extraEnv = B=2

				[dpm]
				extraEnv = C=3
			"},
		)
		.unwrap();
		let v = HelmValuesFile::new(dir, "small", "all").unwrap();
		assert_eq!(v.extra_envs("dpe").unwrap(), Some(json!([{"name": "A", "value": "1"}])));
		assert_eq!(
			v.extra_envs("postgresExporter").unwrap(),
			Some(json!([{"name": "B", "value": "2"}]))
		);
		assert_eq!(
			v.extra_envs("dpm").unwrap(),
			Some(json!([{"name": "TZ", "value": "UTC"}, {"name": "C", "value": "3"}]))
		);
	}

	#[test]
	fn test_set_all_sizing_paths() {
		let temp = sizing_folder();
		let mut v = values_file(temp.path());
		v.set_all_sizing_paths().unwrap();
		let doc = &v.values_doc;
		assert_eq!(doc["mmmBe"]["enabled"], json!(true));
		assert_eq!(doc["dpe"]["enabled"], json!(false));
		assert_eq!(doc["postgresExporter"]["enabled"], json!(true));
		assert_eq!(doc["postgresExporter"]["serviceMonitor"]["enabled"], json!(true));
		assert_eq!(doc["mmmBe"]["replicas"], json!(3));
		assert_eq!(doc["mmmBe"]["javaOpts"], json!("-Xmx2g"));
		assert_eq!(doc["dpe"]["storage"]["tmp"]["sizeLimit"], json!("10Gi"));
		assert_eq!(doc["dpm"]["extraProperties"]["c"], json!(true));
		assert!(doc["mmmBe"].get("extraProperties").is_none());

		let dump = temp.path().join("values.yaml");
		v.dump_values_file(&dump).unwrap();
		let reloaded = yaml::load_all(&dump).unwrap();
		assert_eq!(&reloaded[0], doc);
	}

	#[test]
	fn test_add_section() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		let section = v.add_section("mmmBe", false).unwrap();
		assert_eq!(section["resources"]["memory"]["limits"], json!("2Gi"));
		assert_eq!(section["replicas"], json!(3));
		assert_eq!(section["commonExtraEnvEnabled"], json!(true));
		assert_eq!(section["commonExtraEnv"], json!("TZ=UTC"));

		let template = v.add_section("mmmBe", true).unwrap();
		assert_eq!(template["limits"]["memory"], json!("2Gi"));
		assert_eq!(template["requests"]["cpu"], json!("500m"));
	}

	#[test]
	fn test_ini_yaml_and_multiply() {
		let temp = sizing_folder();
		let v = values_file(temp.path());
		let (yaml_file, json_file) = v.ini_yaml(temp.path()).unwrap();
		assert!(yaml_file.ends_with("perf_standard_ini_sizing.yaml"));
		let json: Value = serde_json::from_str(&fs::read_to_string(json_file).unwrap()).unwrap();
		assert_eq!(json["dpm"]["extraEnv"], json!([{"name": "JAVA_TOOL", "value": "x"}]));

		let components = vec!["mmmBe".to_string(), "unknown".to_string()];
		let file = v.multiply_resources(temp.path(), 3.0, 2.0, &components).unwrap();
		assert!(file.ends_with("perf_standard_3x_cpu_2x_mem.yaml"));
		let doc = &yaml::load_all(&file).unwrap()[0];
		assert_eq!(doc["mmmBe"]["resources"]["requests"]["cpu"], json!(1.5));
		assert_eq!(doc["mmmBe"]["resources"]["limits"]["memory"], json!(4.0 * GIBS));
		assert!(doc.get("dpe").is_none());
	}

	#[test]
	fn test_app_templates() {
		let temp = sizing_folder();
		let out = temp.path().join("out");
		let written = app_templates(temp.path(), &["perf_standard".to_string()], "basic", &out).unwrap();
		assert_eq!(written.len(), 8);
		let file = out.join("templates/services/dpm/sizing/dpm.json");
		let data: Value = serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
		assert_eq!(data["chartRootKey"], json!("dpm"));
		assert_eq!(data["default"], json!({}));
		assert_eq!(data["sizing"]["perf_standard"]["limits"]["cpu"], json!("2"));
	}

	#[rstest]
	#[case::int("10", json!(10))]
	#[case::float("1.5", json!(1.5))]
	#[case::bool("False", json!(false))]
	#[case::text("abc", json!("abc"))]
	#[case::not_a_number("nan", json!("nan"))]
	fn test_typed_value(#[case] input: &str, #[case] expected: Value) {
		assert_eq!(typed_value(input), expected);
	}

	#[test]
	fn test_disabled_modules_prefix_rule() {
		let sections = vec!["termSuggestions".to_string(), "api".to_string(), "dpe".to_string()];
		let enabled = vec!["termSuggestions/api".to_string()];
		assert_eq!(disabled_modules(&sections, &enabled), ["api", "dpe"]);
	}

	#[test]
	fn test_sizing_report() {
		let temp = sizing_folder();
		let out = temp.path().join("helm_builds");
		let report = sizing_report(temp.path(), &out, "main", "perf_standard", "basic").unwrap();
		assert!(report.values_file.ends_with("perf_standard-values.yaml"));
		assert!(report.values_file.is_file());
		assert!(report.report_folder.starts_with(out.join("generated").join("main").join("perf_standard")));
		assert!(report.report_folder.join("main_resources.html").is_file());
		assert!(report.written.iter().any(|p| p.ends_with("main_perf_standard-values.yaml.ini")));
	}
}
