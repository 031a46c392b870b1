//! Pods command handler.

use std::{collections::BTreeMap, fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use crate::{
	commands::util::output_dir,
	config::Settings,
	kubectl,
	process::{self, CommandRunner, SystemRunner},
	yaml,
};

#[derive(Args)]
pub struct PodsArgs {
	#[command(subcommand)]
	pub command: PodsCommands,

	/// Log level (possible values: disabled, fatal, error, warn, info, debug, trace)
	#[arg(long, default_value = "info", global = true)]
	pub log_level: String,
}

#[derive(Subcommand)]
pub enum PodsCommands {
	/// Logs of running pods, dumped as JSON into `logsDumpDir`
	Logs(LogsArgs),
}

#[derive(Args)]
pub struct LogsArgs {
	/// Load a previous dump instead of asking the cluster
	#[arg(long)]
	pub from_file: Option<PathBuf>,

	/// Include running pods whose name contains any of these
	#[arg(long, value_delimiter = ',', default_value = "dpm")]
	pub matched_pods: Vec<String>,

	/// Defaults to the configured namespace
	#[arg(short = 'n', long)]
	pub namespace: Option<String>,

	/// Only logs newer than this duration
	#[arg(long, default_value = kubectl::DEFAULT_SINCE)]
	pub since: String,
}

pub fn run<W: Write>(args: PodsArgs, writer: W) -> Result<()> {
	match args.command {
		PodsCommands::Logs(args) => logs(&SystemRunner, &Settings::load()?, args, writer),
	}
}

pub fn logs<R: CommandRunner, W: Write>(runner: &R, settings: &Settings, args: LogsArgs, mut writer: W) -> Result<()> {
	let logs: BTreeMap<String, String> = match &args.from_file {
		Some(file) => {
			info!("loading logs from {}", file.display());
			let content = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
			serde_json::from_str(&content).with_context(|| format!("failed to parse {}", file.display()))?
		}
		None => {
			let ns = args.namespace.as_deref().unwrap_or(&settings.namespace);
			info!("loading logs from cluster for {:?}", args.matched_pods);
			let pods = kubectl::pods(runner, ns)?;
			let names = kubectl::running_pods_matching(&pods, &args.matched_pods);
			let logs = kubectl::pod_logs(runner, &names, ns, Some(&args.since))?;
			let dump = output_dir(Some(settings.logs_dump_dir.clone()))?.join(format!("{}.json", process::time_stamp()));
			info!("dumping to {}", dump.display());
			yaml::write_json(&dump, &logs, 4)?;
			logs
		}
	};
	for (name, log) in &logs {
		writeln!(writer, "{name}: log length: {}", log.len())?;
	}
	Ok(())
}
