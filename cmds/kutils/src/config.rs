//! Configuration file support for kutils
//!
//! Supports `.kutils-config.yaml` files that can be placed anywhere in the directory
//! hierarchy. kutils searches from the current directory upward to the filesystem root.
//! Values from the file override the built-in defaults, `KUTILS_*` environment
//! variables override both.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// The name of the config file kutils looks for
pub const CONFIG_FILE_NAME: &str = ".kutils-config.yaml";

/// Prefix of environment variables overriding settings
pub const ENV_PREFIX: &str = "KUTILS_";

pub const DEFAULT_HELM_APP_NAME: &str = "ataccama-one";
pub const DEFAULT_NAMESPACE: &str = "product";

/// Resolved settings used by the commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	/// Root of all generated and checked-out artefacts
	pub artefacts_dir: PathBuf,
	/// Folder with `sizings.ini`, `modules.ini` and the per-sizing ini files
	pub sizing_folder: PathBuf,
	/// Where generated values files and reports are stored
	pub helm_perf_values_dir: PathBuf,
	/// Helm chart used by install/upgrade
	pub charts_path: PathBuf,
	pub logs_dump_dir: PathBuf,
	pub helm_app_name: String,
	pub namespace: String,
	pub kube_context: Option<String>,
}

/// Contents of `.kutils-config.yaml`, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsFile {
	#[serde(default)]
	pub artefacts_dir: Option<PathBuf>,
	#[serde(default)]
	pub sizing_folder: Option<PathBuf>,
	#[serde(default)]
	pub helm_perf_values_dir: Option<PathBuf>,
	#[serde(default)]
	pub charts_path: Option<PathBuf>,
	#[serde(default)]
	pub logs_dump_dir: Option<PathBuf>,
	#[serde(default)]
	pub helm_app_name: Option<String>,
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub kube_context: Option<String>,
}

impl SettingsFile {
	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let config: SettingsFile = serde_yaml::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		Ok(config)
	}

	/// Overrides taken from `KUTILS_*` variables
	pub fn from_env<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());
		Self {
			artefacts_dir: var("ARTEFACTS_DIR").map(PathBuf::from),
			sizing_folder: var("SIZING_FOLDER").map(PathBuf::from),
			helm_perf_values_dir: var("HELM_PERF_VALUES_DIR").map(PathBuf::from),
			charts_path: var("CHARTS_PATH").map(PathBuf::from),
			logs_dump_dir: var("LOGS_DUMP_DIR").map(PathBuf::from),
			helm_app_name: var("HELM_APP_NAME"),
			namespace: var("NAMESPACE"),
			kube_context: var("KUBE_CONTEXT"),
		}
	}

	/// Merge `other` over this config (values set in `other` win)
	pub fn merge_from(&mut self, other: SettingsFile) {
		macro_rules! take {
			($($field:ident),*) => {
				$(if other.$field.is_some() {
					self.$field = other.$field;
				})*
			};
		}
		take!(
			artefacts_dir,
			sizing_folder,
			helm_perf_values_dir,
			charts_path,
			logs_dump_dir,
			helm_app_name,
			namespace,
			kube_context
		);
	}

	/// Join relative paths onto `base`
	pub fn relative_to(self, base: &Path) -> Self {
		let abs = |p: Option<PathBuf>| p.map(|p| if p.is_absolute() { p } else { base.join(p) });
		Self {
			artefacts_dir: abs(self.artefacts_dir),
			sizing_folder: abs(self.sizing_folder),
			helm_perf_values_dir: abs(self.helm_perf_values_dir),
			charts_path: abs(self.charts_path),
			logs_dump_dir: abs(self.logs_dump_dir),
			..self
		}
	}

	/// Fill the gaps with defaults. Relative paths are resolved against `base`.
	pub fn resolve(self, base: &Path) -> Settings {
		let abs = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
		let artefacts_dir = abs(self.artefacts_dir.unwrap_or_else(|| PathBuf::from("../cpt_artefacts")));
		let under_artefacts = |p: Option<PathBuf>, default: &str| p.map_or_else(|| artefacts_dir.join(default), |p| abs(p));
		Settings {
			sizing_folder: under_artefacts(self.sizing_folder, "sizing"),
			helm_perf_values_dir: under_artefacts(self.helm_perf_values_dir, "helm_builds"),
			charts_path: under_artefacts(self.charts_path, "charts"),
			logs_dump_dir: under_artefacts(self.logs_dump_dir, "logs_dumps"),
			helm_app_name: self
				.helm_app_name
				.unwrap_or_else(|| DEFAULT_HELM_APP_NAME.to_string()),
			namespace: self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
			kube_context: self.kube_context,
			artefacts_dir,
		}
	}
}

impl Settings {
	/// Defaults, then the nearest config file, then the process environment
	pub fn load() -> Result<Self> {
		let cwd = std::env::current_dir().context("failed to get current directory")?;
		Self::load_from(&cwd, |name| std::env::var(name).ok())
	}

	pub fn load_from<F>(start_dir: &Path, lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut file = SettingsFile::default();
		if let Some(config_path) = find_config_file(start_dir) {
			debug!(path = %config_path.display(), "loading config file");
			file = SettingsFile::load_from_file(&config_path)?;
			// Paths in the config file are relative to the file itself
			if let Some(parent) = config_path.parent() {
				file = file.relative_to(parent);
			}
		}
		file.merge_from(SettingsFile::from_env(lookup));
		Ok(file.resolve(start_dir))
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir.to_path_buf();

	// Canonicalize if possible to handle relative paths
	if let Ok(canonical) = current.canonicalize() {
		current = canonical;
	}

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.exists() {
			return Some(config_path);
		}
		match current.parent() {
			Some(parent) if parent != current => current = parent.to_path_buf(),
			_ => break,
		}
	}

	None
}
