use anyhow::{Context, Result, bail};
use log::info;

use crate::cli::{BuildArgs, Cli};
use crate::common::resolve_output_path;
use crate::config::Config;
use crate::pipeline;
use crate::source::{DiskSource, RoutedSource};

pub fn run(cli: &Cli, args: &BuildArgs) -> Result<()> {
    if args.kinds.len() != args.outs.len() {
        bail!("[build] Got {} --kind but {} --out; they are paired in order", args.kinds.len(), args.outs.len());
    }

    let config = Config::load(cli.config.as_deref())?;
    let source = RoutedSource::new(cli.data_dir.clone().map(DiskSource::new).unwrap_or_default());

    for (name, out) in args.kinds.iter().zip(&args.outs) {
        let kind = config.from_alias(name)
            .with_context(|| format!("[build] Incorrect kind of map: {name:?}"))?;
        info!("[build] map kind: {name} -> {kind}");

        let output = pipeline::run(kind, &config, &source)?;

        let path = resolve_output_path(out, &kind.default_map_file());
        output.map.save(&path)?;

        if let Some(dir) = &args.save_tables {
            output.table.save_tables(dir, &kind.table_stem())?;
            info!("[build] aggregate tables written to {}", dir.display());
        }

        println!("Built {kind} map -> {}", path.display());
    }
    Ok(())
}
