//! `kubectl` queries used by the pod and helm commands.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use k8s::paths::{KIND, METADATA_NAME};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
	docpath,
	process::{cmd, CmdOutput, CommandRunner},
};

pub const KUBECTL: &str = "kubectl";
pub const DEFAULT_SINCE: &str = "4h";
pub const MINIO_STS: &str = "statefulset.apps/minio";
pub const MINIO_SELECTOR: &str = "--selector=app=minio";
pub const RUNNING: &str = "Running";

const STATUS_PHASE: &str = "status/phase";

fn run_checked<R: CommandRunner>(runner: &R, command: &[String]) -> Result<CmdOutput> {
	let output = runner.run(command)?;
	if output.exit_code != 0 {
		anyhow::bail!("{}", output.error_msg());
	}
	Ok(output)
}

fn items(stdout: &str) -> Result<Vec<Value>> {
	let data: Value = serde_json::from_str(stdout).context("kubectl returned invalid JSON")?;
	match data.get("items") {
		Some(Value::Array(items)) => Ok(items.clone()),
		_ => anyhow::bail!("kubectl output has no `items` list"),
	}
}

pub fn current_context<R: CommandRunner>(runner: &R) -> Result<String> {
	let output = run_checked(runner, &cmd([KUBECTL, "config", "current-context"]))?;
	Ok(output.stdout)
}

pub fn use_context<R: CommandRunner>(runner: &R, context: &str) -> Result<()> {
	run_checked(runner, &cmd([KUBECTL, "config", "use-context", context]))?;
	Ok(())
}

/// Pod objects of `kubectl get pod -o json`
#[instrument(skip(runner))]
pub fn pods<R: CommandRunner>(runner: &R, ns: &str) -> Result<Vec<Value>> {
	let output = run_checked(runner, &cmd([KUBECTL, "get", "pod", "-n", ns, "-o", "json"]))?;
	items(&output.stdout)
}

/// Logs of the last [`DEFAULT_SINCE`] (or `since`) by pod name
pub fn pod_logs<R: CommandRunner>(
	runner: &R,
	names: &[String],
	ns: &str,
	since: Option<&str>,
) -> Result<BTreeMap<String, String>> {
	let since = since.unwrap_or(DEFAULT_SINCE);
	let mut out = BTreeMap::new();
	for name in names {
		let output = runner.run(&cmd([KUBECTL, "logs", name.as_str(), "-n", ns, "--since", since]))?;
		if output.exit_code != 0 {
			warn!("{}", output.error_msg());
		}
		out.insert(name.clone(), output.stdout);
	}
	Ok(out)
}

/// `persistentvolumeclaim/<name>` of the minio volume claims
pub fn pvc_names<R: CommandRunner>(runner: &R, ns: &str) -> Result<Vec<String>> {
	let output = run_checked(runner, &cmd([KUBECTL, "get", "pvc", MINIO_SELECTOR, "-n", ns, "-o", "json"]))?;
	Ok(items(&output.stdout)?
		.iter()
		.filter(|item| item.get(KIND).and_then(Value::as_str) == Some("PersistentVolumeClaim"))
		.filter_map(|item| docpath::get(item, METADATA_NAME).and_then(Value::as_str))
		.map(|name| format!("persistentvolumeclaim/{name}"))
		.collect())
}

/// Set the storage request of every claim to `size` (e.g. `12Gi`)
pub fn patch_pvcs<R: CommandRunner>(runner: &R, names: &[String], ns: &str, size: &str) -> Result<Vec<CmdOutput>> {
	let patch = json!({"spec": {"resources": {"requests": {"storage": size}}}}).to_string();
	names
		.iter()
		.map(|name| {
			info!("patch {name}");
			let output = runner.run(&cmd([KUBECTL, "patch", name.as_str(), "-p", patch.as_str(), "-n", ns]))?;
			info!("{}", output.error_msg());
			Ok(output)
		})
		.collect()
}

pub fn delete_minio_sts<R: CommandRunner>(runner: &R, ns: &str) -> Result<CmdOutput> {
	let output = runner.run(&cmd([KUBECTL, "delete", MINIO_STS, "-n", ns, "-o", "json"]))?;
	info!("{}", output.error_msg());
	Ok(output)
}

fn pod_name(pod: &Value) -> Option<&str> {
	docpath::get(pod, METADATA_NAME).and_then(Value::as_str)
}

/// Names of running pods containing any of `patterns`
pub fn running_pods_matching(pods: &[Value], patterns: &[String]) -> Vec<String> {
	pods.iter()
		.filter(|pod| docpath::get(pod, STATUS_PHASE).and_then(Value::as_str) == Some(RUNNING))
		.filter_map(pod_name)
		.filter(|name| patterns.iter().any(|p| name.contains(p.as_str())))
		.map(str::to_string)
		.collect()
}
