mod tools;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

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
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Mosaic overlapping DEMs into a tiled output raster
	Mosaic(tools::mosaic::Subcommand),

	/// Show the georeference and extent of a DEM
	Probe(tools::probe::Subcommand),
}

fn main() {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	if let Err(error) = run(cli) {
		// One diagnostic line on stderr, non-zero exit.
		eprintln!("error: {error:#}");
		std::process::exit(1);
	}
}

fn run(cli: Cli) -> anyhow::Result<()> {
	match &cli.command {
		Commands::Mosaic(arguments) => tools::mosaic::run(arguments),
		Commands::Probe(arguments) => tools::probe::run(arguments),
	}
}
