mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

// Define the command-line interface using the clap crate
#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Scan the radiance raster and emit the zones.db artifact
	Generate(tools::generate::Subcommand),

	/// Re-scan with atmospheric scatter added and re-emit the artifact
	Skyglow(tools::skyglow::Subcommand),

	/// Check the artifact against bundled reference coordinates
	Validate(tools::validate::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize logger and set log level based on verbosity flag
	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Generate(arguments) => tools::generate::run(arguments),
		Commands::Skyglow(arguments) => tools::skyglow::run(arguments),
		Commands::Validate(arguments) => tools::validate::run(arguments),
	}
}
