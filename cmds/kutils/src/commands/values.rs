//! Values command handler.

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use crate::{
	commands::util::write_paths,
	config::Settings,
	values::analysis::{from_properties, HelmValuesAnalysis},
	yaml,
};

#[derive(Args)]
pub struct ValuesArgs {
	#[command(subcommand)]
	pub command: ValuesCommands,

	/// Log level (possible values: disabled, fatal, error, warn, info, debug, trace)
	#[arg(long, default_value = "info", global = true)]
	pub log_level: String,
}

#[derive(Subcommand)]
pub enum ValuesCommands {
	/// Resource keys of every values file as HTML, JSON and INI reports
	Analyze(AnalyzeArgs),

	/// Flattened keys of the values files
	Keys(KeysArgs),

	/// Template lines referencing `.Values.`
	Placeholders(FolderArgs),

	/// Store all values as `key=<url-encoded value>` lines
	ToProperties(ToPropertiesArgs),

	/// Rebuild a values file from a properties file
	FromProperties(FromPropertiesArgs),
}

#[derive(Args)]
pub struct FolderArgs {
	/// Charts folder to analyse
	#[arg(long)]
	pub folder: PathBuf,
}

#[derive(Args)]
pub struct AnalyzeArgs {
	#[arg(long)]
	pub folder: PathBuf,

	#[arg(long)]
	pub branch: String,

	/// Defaults to `<helmPerfValuesDir>/charts/<branch>/resources`
	#[arg(long)]
	pub report_folder: Option<PathBuf>,
}

#[derive(Args)]
pub struct KeysArgs {
	#[arg(long)]
	pub folder: PathBuf,

	/// Only `key=value` of keys containing this text
	#[arg(long)]
	pub contain: Option<String>,
}

#[derive(Args)]
pub struct ToPropertiesArgs {
	#[arg(long)]
	pub folder: PathBuf,

	#[arg(long)]
	pub output: PathBuf,
}

#[derive(Args)]
pub struct FromPropertiesArgs {
	#[arg(long)]
	pub input: PathBuf,

	#[arg(long)]
	pub output: PathBuf,
}

pub fn run<W: Write>(args: ValuesArgs, writer: W) -> Result<()> {
	match args.command {
		ValuesCommands::Analyze(args) => {
			let report_folder = match args.report_folder.clone() {
				Some(folder) => folder,
				None => Settings::load()?
					.helm_perf_values_dir
					.join("charts")
					.join(&args.branch)
					.join("resources"),
			};
			analyze(args, report_folder, writer)
		}
		ValuesCommands::Keys(args) => keys(args, writer),
		ValuesCommands::Placeholders(args) => placeholders(args, writer),
		ValuesCommands::ToProperties(args) => to_properties(args, writer),
		ValuesCommands::FromProperties(args) => from_properties_file(args, writer),
	}
}

pub fn analyze<W: Write>(args: AnalyzeArgs, report_folder: PathBuf, mut writer: W) -> Result<()> {
	let analysis = HelmValuesAnalysis::new(&args.folder)?;
	let written = analysis.analyze(&args.branch, &report_folder)?;
	write_paths(&mut writer, &written)
}

pub fn keys<W: Write>(args: KeysArgs, mut writer: W) -> Result<()> {
	let analysis = HelmValuesAnalysis::new(&args.folder)?;
	match args.contain {
		Some(contain) => {
			for line in analysis.list_keys(&contain) {
				writeln!(writer, "{line}")?;
			}
		}
		None => {
			for key in analysis.value_keys() {
				writeln!(writer, "{}", key.join("."))?;
			}
		}
	}
	Ok(())
}

pub fn placeholders<W: Write>(args: FolderArgs, mut writer: W) -> Result<()> {
	let analysis = HelmValuesAnalysis::new(&args.folder)?;
	for line in analysis.placeholders() {
		writeln!(writer, "{line}")?;
	}
	Ok(())
}

pub fn to_properties<W: Write>(args: ToPropertiesArgs, mut writer: W) -> Result<()> {
	let analysis = HelmValuesAnalysis::new(&args.folder)?;
	let count = analysis.to_properties(&args.output)?;
	writeln!(writer, "{count} properties written to {}", args.output.display())?;
	Ok(())
}

pub fn from_properties_file<W: Write>(args: FromPropertiesArgs, mut writer: W) -> Result<()> {
	let doc = from_properties(&args.input)?;
	info!("writing values to {}", args.output.display());
	yaml::write_yaml(&args.output, &doc)?;
	writeln!(writer, "{}", args.output.display())?;
	Ok(())
}
