//! Sizing command handler.

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::{
	commands::util::{output_dir, write_paths},
	config::Settings,
	manifest::bare_file_name,
	sizing::{compare_files, Sizing},
	values::generate::{app_templates, sizing_report, HelmValuesFile},
};

#[derive(Args)]
pub struct SizingArgs {
	#[command(subcommand)]
	pub command: SizingCommands,

	/// Log level (possible values: disabled, fatal, error, warn, info, debug, trace)
	#[arg(long, default_value = "info", global = true)]
	pub log_level: String,
}

#[derive(Subcommand)]
pub enum SizingCommands {
	/// Sizing report (JSON, HTML, CSV) of a rendered manifest
	Report(ReportArgs),

	/// Compare two sizing CSV reports
	Compare(CompareArgs),

	/// Generate the values file of a sizing and analyse it
	Generate(GenerateArgs),

	/// Dump the sizing sections as YAML and JSON
	IniYaml(IniYamlArgs),

	/// Scale the resources of selected components
	Multiply(MultiplyArgs),

	/// Per component application templates for several sizings
	AppTemplates(AppTemplatesArgs),
}

#[derive(Args)]
pub struct ReportArgs {
	/// Multi-document manifest, e.g. `helm template` output
	#[arg(long)]
	pub manifest: PathBuf,

	/// Output folder, defaults to the folder of the manifest
	#[arg(long)]
	pub out: Option<PathBuf>,

	/// Base name of the reports, defaults to `<manifest>_sizing`
	#[arg(long)]
	pub name: Option<String>,
}

#[derive(Args)]
pub struct CompareArgs {
	pub left: PathBuf,
	pub right: PathBuf,
}

/// Sizing and module set as named in `sizings.ini` and `modules.ini`
#[derive(Args)]
pub struct SizingSelection {
	#[arg(long, default_value = "perf_standard")]
	pub sizing: String,

	#[arg(long, default_value = "basic")]
	pub modules: String,

	/// Folder with `sizings.ini` and `modules.ini`, overrides the configuration
	#[arg(long)]
	pub sizing_folder: Option<PathBuf>,
}

impl SizingSelection {
	fn sizing_folder(&self, settings: &Settings) -> PathBuf {
		self.sizing_folder
			.clone()
			.unwrap_or_else(|| settings.sizing_folder.clone())
	}

	fn values_file(&self, settings: &Settings) -> Result<HelmValuesFile> {
		Ok(HelmValuesFile::new(&self.sizing_folder(settings), &self.sizing, &self.modules)?)
	}
}

#[derive(Args)]
pub struct GenerateArgs {
	#[command(flatten)]
	pub selection: SizingSelection,

	/// Branch of the charts the values are generated for
	#[arg(long)]
	pub branch: String,

	/// Root of the generated reports, overrides `helmPerfValuesDir`
	#[arg(long)]
	pub output_root: Option<PathBuf>,
}

#[derive(Args)]
pub struct IniYamlArgs {
	#[command(flatten)]
	pub selection: SizingSelection,

	#[arg(long)]
	pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct MultiplyArgs {
	#[command(flatten)]
	pub selection: SizingSelection,

	#[arg(long, default_value_t = 3.0)]
	pub cpu: f64,

	#[arg(long, default_value_t = 2.0)]
	pub mem: f64,

	/// Components to scale
	#[arg(long = "component", default_values = ["mmmBe"])]
	pub components: Vec<String>,

	#[arg(long)]
	pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct AppTemplatesArgs {
	#[arg(long = "sizing", default_values = ["minimal", "small", "standard", "large", "xlarge"])]
	pub sizings: Vec<String>,

	#[arg(long, default_value = "basic")]
	pub modules: String,

	#[arg(long)]
	pub sizing_folder: Option<PathBuf>,

	/// `templates/services/...` is created below this folder
	#[arg(long)]
	pub out: Option<PathBuf>,
}

pub fn run<W: Write>(args: SizingArgs, writer: W) -> Result<()> {
	match args.command {
		SizingCommands::Report(args) => report(args, writer),
		SizingCommands::Compare(args) => compare(args, writer),
		SizingCommands::Generate(args) => generate(&Settings::load()?, args, writer),
		SizingCommands::IniYaml(args) => ini_yaml(&Settings::load()?, args, writer),
		SizingCommands::Multiply(args) => multiply(&Settings::load()?, args, writer),
		SizingCommands::AppTemplates(args) => app_template(&Settings::load()?, args, writer),
	}
}

pub fn report<W: Write>(args: ReportArgs, mut writer: W) -> Result<()> {
	let folder = match args.out {
		Some(out) => output_dir(Some(out))?,
		None => args.manifest.parent().map(PathBuf::from).unwrap_or_default(),
	};
	let name = args
		.name
		.unwrap_or_else(|| format!("{}_sizing", bare_file_name(&args.manifest)));
	let modules = Sizing::load(&args.manifest)?.save(&folder, &name)?;
	for module in modules.keys() {
		writeln!(writer, "{module}")?;
	}
	writeln!(writer, "saved to: {}", folder.join(&name).display())?;
	Ok(())
}

pub fn compare<W: Write>(args: CompareArgs, writer: W) -> Result<()> {
	compare_files(&args.left, &args.right)?.write_text(writer)
}

pub fn generate<W: Write>(settings: &Settings, args: GenerateArgs, mut writer: W) -> Result<()> {
	let output_root = args
		.output_root
		.unwrap_or_else(|| settings.helm_perf_values_dir.clone());
	let report = sizing_report(
		&args.selection.sizing_folder(settings),
		&output_root,
		&args.branch,
		&args.selection.sizing,
		&args.selection.modules,
	)?;
	writeln!(writer, "values: {}", report.values_file.display())?;
	write_paths(&mut writer, &report.written)
}

pub fn ini_yaml<W: Write>(settings: &Settings, args: IniYamlArgs, mut writer: W) -> Result<()> {
	let values_file = args.selection.values_file(settings)?;
	let (yaml_file, json_file) = values_file.ini_yaml(&output_dir(args.out)?)?;
	write_paths(&mut writer, &[yaml_file, json_file])
}

pub fn multiply<W: Write>(settings: &Settings, args: MultiplyArgs, mut writer: W) -> Result<()> {
	let values_file = args.selection.values_file(settings)?;
	let file = values_file.multiply_resources(&output_dir(args.out)?, args.cpu, args.mem, &args.components)?;
	write_paths(&mut writer, &[file])
}

pub fn app_template<W: Write>(settings: &Settings, args: AppTemplatesArgs, mut writer: W) -> Result<()> {
	let sizing_folder = args
		.sizing_folder
		.unwrap_or_else(|| settings.sizing_folder.clone());
	let written = app_templates(&sizing_folder, &args.sizings, &args.modules, &output_dir(args.out)?)?;
	write_paths(&mut writer, &written)
}
