//! Helm command handler.

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::{
	config::Settings,
	helm::{self, NOTES},
	kubectl,
	process::{CommandRunner, SystemRunner},
};

#[derive(Args)]
pub struct HelmArgs {
	#[command(subcommand)]
	pub command: HelmCommands,

	/// Log level (possible values: disabled, fatal, error, warn, info, debug, trace)
	#[arg(long, default_value = "info", global = true)]
	pub log_level: String,
}

#[derive(Subcommand)]
pub enum HelmCommands {
	/// Store `helm get <command>` of a release in `<helmPerfValuesDir>/helm_get`
	Get(GetArgs),

	/// `deploymentInfo` of the release notes
	DeploymentInfo(DeploymentInfoArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GetCommand {
	Values,
	Notes,
	Manifest,
}

impl GetCommand {
	pub fn as_str(self) -> &'static str {
		match self {
			GetCommand::Values => "values",
			GetCommand::Notes => NOTES,
			GetCommand::Manifest => "manifest",
		}
	}
}

#[derive(Args)]
pub struct GetArgs {
	#[arg(short = 'c', long, value_enum)]
	pub command: GetCommand,

	/// Deployment namespace, also used as the release name
	#[arg(short = 'n', long)]
	pub namespace: String,

	/// Output folder, overrides `<helmPerfValuesDir>/helm_get`
	#[arg(long)]
	pub folder: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeploymentInfoArgs {
	/// Namespace of the release, defaults to the configured one
	#[arg(short = 'n', long)]
	pub namespace: Option<String>,

	/// Release name, defaults to the configured one
	#[arg(long)]
	pub app: Option<String>,

	/// Kube context to switch to first, defaults to the configured one
	#[arg(long)]
	pub context: Option<String>,
}

pub fn run<W: Write>(args: HelmArgs, writer: W) -> Result<()> {
	let settings = Settings::load()?;
	match args.command {
		HelmCommands::Get(args) => get(&SystemRunner, &settings, args, writer),
		HelmCommands::DeploymentInfo(args) => deployment_info(&SystemRunner, &settings, args, writer),
	}
}

pub fn get<R: CommandRunner, W: Write>(runner: &R, settings: &Settings, args: GetArgs, mut writer: W) -> Result<()> {
	let folder = args
		.folder
		.unwrap_or_else(|| settings.helm_perf_values_dir.join("helm_get"));
	writeln!(writer, "folder: {}", folder.display())?;
	let file = helm::get_to_file(
		runner,
		args.command.as_str(),
		&args.namespace,
		&args.namespace,
		&folder,
		None,
	)?;
	writeln!(writer, "{}", file.display())?;
	Ok(())
}

pub fn deployment_info<R: CommandRunner, W: Write>(
	runner: &R,
	settings: &Settings,
	args: DeploymentInfoArgs,
	mut writer: W,
) -> Result<()> {
	if let Some(context) = args.context.as_ref().or(settings.kube_context.as_ref()) {
		kubectl::use_context(runner, context)?;
		writeln!(writer, "context: {}", kubectl::current_context(runner)?)?;
	}
	let ns = args.namespace.as_deref().unwrap_or(&settings.namespace);
	let app = args.app.as_deref().unwrap_or(&settings.helm_app_name);
	let notes = helm::get_output(runner, NOTES, app, ns)?;
	match helm::deployment_info(&notes) {
		Some(info) => writeln!(writer, "{info}")?,
		None => writeln!(writer, "no deployment info in the notes of {app} in {ns}")?,
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;
	use crate::test_utils::FakeRunner;

	fn settings(root: &std::path::Path) -> Settings {
		Settings::load_from(root, |_| None).unwrap()
	}

	#[test]
	fn test_deployment_info_switches_context() {
		let temp = TempDir::new().unwrap();
		let runner = FakeRunner::new()
			.with_output("kubectl config use-context", "")
			.with_output("kubectl config current-context", "perf")
			.with_output(
				"helm get notes ataccama-one -n staging",
				"NOTES:\ndeploymentInfo: branch=main,sizing=perf_standard\n",
			);
		let args = DeploymentInfoArgs {
			namespace: Some("staging".to_string()),
			app: None,
			context: Some("perf".to_string()),
		};
		let mut out = Vec::new();
		deployment_info(&runner, &settings(temp.path()), args, &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "context: perf\nbranch=main,sizing=perf_standard\n");
		assert_eq!(runner.calls()[0], ["kubectl", "config", "use-context", "perf"]);
	}

	#[test]
	fn test_get_stores_into_folder() {
		let temp = TempDir::new().unwrap();
		let runner = FakeRunner::new().with_output("helm get manifest staging -n staging", "kind: Pod\n");
		let args = GetArgs {
			command: GetCommand::Manifest,
			namespace: "staging".to_string(),
			folder: Some(temp.path().join("helm_get")),
		};
		let mut out = Vec::new();
		get(&runner, &settings(temp.path()), args, &mut out).unwrap();
		let out = String::from_utf8(out).unwrap();
		let file = PathBuf::from(out.lines().last().unwrap());
		assert_eq!(std::fs::read_to_string(file).unwrap(), "kind: Pod\n");
	}
}
