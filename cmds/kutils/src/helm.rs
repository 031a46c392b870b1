//! `helm` command lines.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::process::{self, cmd, CommandRunner};

pub const HELM: &str = "helm";
pub const NOTES: &str = "notes";

/// Key of the deployment summary in the release notes:
/// `deploymentInfo: test_env=paas_dq_sa,branch=release-14.3.X,sizing=perf_standard,modules=basic_ai`
pub const DEPLOYMENT_INFO: &str = "deploymentInfo";

pub fn uninstall(app: &str, ns: &str) -> Vec<String> {
	cmd([HELM, "uninstall", app, "-n", ns])
}

/// `command` is `install` or `upgrade`
pub fn deploy(command: &str, app: &str, ns: &str, charts_path: &Path, dry_run: bool) -> Vec<String> {
	let charts_path = charts_path.to_string_lossy();
	let mut out = cmd([HELM, command, app, charts_path.as_ref(), "-n", ns]);
	if dry_run {
		out.push("--dry-run".to_string());
	}
	out
}

pub fn install(app: &str, ns: &str, charts_path: &Path, dry_run: bool) -> Vec<String> {
	deploy("install", app, ns, charts_path, dry_run)
}

pub fn upgrade(app: &str, ns: &str, charts_path: &Path, dry_run: bool) -> Vec<String> {
	deploy("upgrade", app, ns, charts_path, dry_run)
}

pub fn update_dependency(charts_path: &Path) -> Vec<String> {
	let charts_path = charts_path.to_string_lossy();
	cmd([HELM, "dependency", "update", charts_path.as_ref()])
}

/// `command` is `values`, `notes` or `manifest`
pub fn get(command: &str, app: &str, ns: &str) -> Vec<String> {
	cmd([HELM, "get", command, app, "-n", ns])
}

/// Output of `helm get <command>`, stderr when nothing was written to stdout
pub fn get_output<R: CommandRunner>(runner: &R, command: &str, app: &str, ns: &str) -> Result<String> {
	let output = runner.run(&get(command, app, ns))?;
	Ok(output.stdout_or_stderr().to_string())
}

/// Store the stdout of `helm get <command>` as `<folder>/<file_name>`.
///
/// The default name is `<ns>_<command>_<timestamp>.yaml`.
pub fn get_to_file<R: CommandRunner>(
	runner: &R,
	command: &str,
	app: &str,
	ns: &str,
	folder: &Path,
	file_name: Option<&str>,
) -> Result<PathBuf> {
	let output = runner.run(&get(command, app, ns))?;
	if !output.success() {
		warn!("{}", output.error_msg());
	}
	let file_name = file_name.map_or_else(|| format!("{ns}_{command}_{}.yaml", process::time_stamp()), str::to_string);
	fs::create_dir_all(folder).with_context(|| format!("failed to create {}", folder.display()))?;
	let file_path = folder.join(file_name);
	fs::write(&file_path, &output.stdout).with_context(|| format!("failed to write {}", file_path.display()))?;
	info!("saved to {}", file_path.display());
	Ok(file_path)
}

/// The value following `deploymentInfo` in the release notes
pub fn deployment_info(notes: &str) -> Option<String> {
	let parts: Vec<&str> = notes.split(':').map(str::trim).collect();
	let found = parts
		.iter()
		.position(|part| *part == DEPLOYMENT_INFO)
		.and_then(|idx| parts.get(idx + 1));
	if found.is_none() {
		warn!("{DEPLOYMENT_INFO} not found in {notes}");
	}
	found.map(|s| s.to_string())
}
