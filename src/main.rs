use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use frgeostat::cli::{Cli, Commands};
use frgeostat::commands::{build, ls};

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    // RUST_LOG, when set, overrides the flags
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Ls(args) => ls::run(&cli, args),
    }
}
