//! Manifest command handler.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use crate::{
	manifest::{bare_file_name, report_path, resources_table, totals_table, ManifestAnalysis, ManifestType},
	report,
	sizing::Sizing,
};

#[derive(Args)]
pub struct ManifestArgs {
	#[command(subcommand)]
	pub command: ManifestCommands,

	/// Log level (possible values: disabled, fatal, error, warn, info, debug, trace)
	#[arg(long, default_value = "info", global = true)]
	pub log_level: String,
}

#[derive(Subcommand)]
pub enum ManifestCommands {
	/// Container resources of a manifest as an HTML report and totals
	Resources(ResourcesArgs),
}

#[derive(Args)]
pub struct ResourcesArgs {
	/// Manifest or `kubectl get -o yaml` output to analyse
	#[arg(long)]
	pub file: PathBuf,

	#[arg(long, value_enum, default_value_t = ManifestType::Manifest)]
	pub manifest_type: ManifestType,

	/// Include linkerd proxy containers
	#[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
	pub linkerd: bool,
}

pub fn run<W: Write>(args: ManifestArgs, writer: W) -> Result<()> {
	match args.command {
		ManifestCommands::Resources(args) => resources(args, writer),
	}
}

/// Write the per container report next to the file and print the totals.
///
/// Multi-document manifests also get a sizing report.
pub fn resources<W: Write>(args: ResourcesArgs, mut writer: W) -> Result<()> {
	let analysis = ManifestAnalysis::load(&args.file, args.manifest_type)?;
	let resources = analysis.extract_resources(args.linkerd);
	let html_file = report_path(&args.file, args.manifest_type, args.linkerd);
	let html = report::html_page(&bare_file_name(&args.file), &resources_table(&resources).to_html()?);
	fs::write(&html_file, html).with_context(|| format!("failed to write {}", html_file.display()))?;
	writeln!(
		writer,
		"resources: {} containers, saved to: {}",
		resources.len(),
		html_file.display()
	)?;
	totals_table(&resources).write_text(&mut writer)?;

	if args.manifest_type == ManifestType::Manifest {
		let folder = html_file.parent().map(PathBuf::from).unwrap_or_default();
		let base_name = format!("{}_sizing", bare_file_name(&args.file));
		info!("saving sizing {base_name}");
		let modules = Sizing::load(&args.file)?.save(&folder, &base_name)?;
		writeln!(writer, "sizing: {} modules, saved to: {}", modules.len(), folder.join(base_name).display())?;
	}
	Ok(())
}
