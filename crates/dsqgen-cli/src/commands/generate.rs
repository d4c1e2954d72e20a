use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use dsqgen_core::config::{read_config, DsqgenConfig};
use dsqgen_core::query::validate_query_id;
use dsqgen_core::QueryGenerator;

use crate::args::GenerateArgs;
use crate::commands::absolute;

pub fn run(args: &GenerateArgs) -> Result<()> {
    // Load optional dsqgen.toml config; CLI flags override it
    let mut config = read_config(Path::new("."))?.unwrap_or_default();
    apply_overrides(&mut config, args)?;

    let generator = QueryGenerator::from_config(&config)?;
    let seed = args.seed.unwrap_or_else(|| config.seed());

    let ids: Vec<u8> = if !args.query.is_empty() {
        args.query
            .iter()
            .map(|&id| validate_query_id(id))
            .collect::<dsqgen_core::Result<_>>()?
    } else {
        let configured = config.query_ids()?;
        if configured.is_empty() {
            generator.query_ids()
        } else {
            configured
        }
    };
    if ids.is_empty() {
        bail!("No query templates loaded. Pass --templates with a directory of query<N>.tpl files.");
    }

    let format = args.output_format();
    tracing::debug!("Generating {} queries with seed {}", ids.len(), seed);

    match &args.output {
        Some(path) => {
            let pb = ProgressBar::new(ids.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("=> "),
            );
            let progress = |id: u8, done: usize, _total: usize| {
                pb.set_position(done as u64);
                pb.set_message(format!("query{}", id));
            };
            let queries = generator.generate(&ids, seed, Some(&progress))?;
            pb.finish_with_message(format!("Generated {} queries ✓", queries.len()));

            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            format.write(&mut writer, &queries)?;
            writer.flush()?;

            eprintln!(
                "Wrote {} queries (seed {}) to {}",
                queries.len(),
                seed,
                path.display()
            );
        }
        None => {
            let queries = generator.generate(&ids, seed, None)?;
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            format.write(&mut writer, &queries)?;
            writer.flush()?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut DsqgenConfig, args: &GenerateArgs) -> Result<()> {
    if let Some(dir) = &args.templates {
        config.resources.templates = Some(absolute(dir)?);
    }
    if let Some(dir) = &args.distributions {
        config.resources.distributions = Some(absolute(dir)?);
    }
    Ok(())
}
