use anyhow::Result;

use crate::cli::{Cli, Listing, LsArgs};
use crate::config::Config;

pub fn run(cli: &Cli, args: &LsArgs) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    for line in listing(&config, args.what) {
        println!("{line}");
    }
    Ok(())
}

fn listing(config: &Config, what: Listing) -> Vec<String> {
    match what {
        Listing::Zones => config.zones.iter().enumerate()
            .map(|(i, zone)| format!("({i}) {zone}"))
            .collect(),
        Listing::Aliases => config.aliases.iter().enumerate()
            .map(|(i, (kind, aliases))| format!("({i}) {kind}: {}", aliases.join(", ")))
            .collect(),
    }
}
