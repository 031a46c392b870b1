use anyhow::Result;
use clap::{Parser, Subcommand};
use kutils::{commands, commands::util::BrokenPipeGuard, telemetry};

#[derive(Parser)]
#[command(name = "kutils")]
#[command(about = "Kubernetes manifest and Helm values utilities", long_about = None)]
#[command(version = env!("KUTILS_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Analyse rendered manifests and `kubectl get` output
	Manifest(commands::manifest::ManifestArgs),

	/// Sizing reports and values generated from the sizing repository
	Sizing(commands::sizing::SizingArgs),

	/// Analyse the values files of a charts tree
	Values(commands::values::ValuesArgs),

	/// Query Helm releases
	Helm(commands::helm::HelmArgs),

	/// Pod logs
	Pods(commands::pods::PodsArgs),
}

/// Extract log level from command
fn get_log_level(cmd: &Commands) -> &str {
	match cmd {
		Commands::Manifest(args) => &args.log_level,
		Commands::Sizing(args) => &args.log_level,
		Commands::Values(args) => &args.log_level,
		Commands::Helm(args) => &args.log_level,
		Commands::Pods(args) => &args.log_level,
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	telemetry::init(telemetry::parse_level(get_log_level(&cli.command)))?;

	let stdout = BrokenPipeGuard::new(std::io::stdout());

	match cli.command {
		Commands::Manifest(args) => commands::manifest::run(args, stdout),
		Commands::Sizing(args) => commands::sizing::run(args, stdout),
		Commands::Values(args) => commands::values::run(args, stdout),
		Commands::Helm(args) => commands::helm::run(args, stdout),
		Commands::Pods(args) => commands::pods::run(args, stdout),
	}
}
