use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

/// Geospatial statistics about France and politics.
#[derive(Parser, Debug)]
#[command(name = "frgeostat", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Map-kind catalog to use instead of the bundled one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory that relative source paths in the catalog resolve against
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build one or more maps, e.g. `build -k dept -o maps/ -k communes -o maps/co.html`
    Build(BuildArgs),

    /// List the kinds of map this toolbox can build
    Ls(LsArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Kind of map to build (alias accepted); repeat the flag for several maps
    #[arg(short, long = "kind", required = true)]
    pub kinds: Vec<String>,

    /// Output file or directory, paired in order with each --kind
    #[arg(short, long = "out", required = true, value_hint = ValueHint::AnyPath)]
    pub outs: Vec<PathBuf>,

    /// Also write the wide and long aggregate tables (parquet) into this directory
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub save_tables: Option<PathBuf>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum Listing {
    /// Buildable map kinds
    #[value(alias = "zone")]
    Zones,
    /// Accepted names for each map kind
    #[value(alias = "alias")]
    Aliases,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// What should be listed
    #[arg(value_enum, default_value_t = Listing::Zones)]
    pub what: Listing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flags_repeat() {
        let cli = Cli::parse_from(["frgeostat", "-vv", "build", "-k", "dept", "-o", "maps", "--kind", "co", "--out", "co.html"]);
        assert_eq!(cli.verbose, 2);
        let Commands::Build(args) = cli.command else { panic!("expected build") };
        assert_eq!(args.kinds, ["dept", "co"]);
        assert_eq!(args.outs, [PathBuf::from("maps"), PathBuf::from("co.html")]);
        assert!(args.save_tables.is_none());
    }

    #[test]
    fn ls_defaults_to_zones() {
        let cli = Cli::parse_from(["frgeostat", "ls"]);
        assert!(matches!(cli.command, Commands::Ls(LsArgs { what: Listing::Zones })));
        let cli = Cli::parse_from(["frgeostat", "ls", "aliases"]);
        assert!(matches!(cli.command, Commands::Ls(LsArgs { what: Listing::Aliases })));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["frgeostat", "-q", "-v", "ls"]).is_err());
    }
}
