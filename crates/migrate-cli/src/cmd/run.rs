use anyhow::Context;
use clap::Args;
use migrate_core::{
    batch::{self, MigrateOptions, Progress},
    config::Config,
    paths,
    types::RunSummary,
};
use std::path::Path;
use std::time::Duration;

use crate::cmd::load_config;
use crate::output::{print_json, print_table};

#[derive(Args)]
pub struct RunArgs {
    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Files processed concurrently per chunk
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Per-file timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Exit non-zero if any file failed or residual tokens remain
    #[arg(long)]
    pub strict: bool,

    /// Skip the residual scan after the batch
    #[arg(long)]
    pub no_verify: bool,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Config file values, overridden by whatever was given on the command line.
pub fn options(root: &Path, config: &Config, args: &RunArgs) -> anyhow::Result<MigrateOptions> {
    let rule_set = config
        .rule_set()
        .with_context(|| format!("cannot build rule set for preset '{}'", config.preset))?;

    let timeout_seconds = args.timeout.unwrap_or(config.timeout_seconds);
    let mut opts = MigrateOptions::new(root, rule_set);
    opts.walk = config.walk_options();
    opts.chunk_size = args.chunk_size.unwrap_or(config.chunk_size);
    opts.timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
    opts.dry_run = args.dry_run;
    opts.verify = config.verify && !args.no_verify;

    if opts.chunk_size == 0 {
        anyhow::bail!("--chunk-size must be at least 1");
    }
    Ok(opts)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let strict = args.strict || config.strict;
    let opts = options(root, &config, &args)?;

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt
        .block_on(batch::run(&opts, |p: &Progress| {
            if !json {
                eprintln!(
                    "[{}/{}] {}/{} files, {} modified",
                    p.chunk, p.chunks, p.processed, p.total, p.modified
                );
            }
        }))
        .context("migration failed")?;

    if json {
        print_json(&summary)?;
    } else {
        print_summary(root, &summary);
    }

    if strict && !summary.is_clean() {
        anyhow::bail!(
            "strict mode: {} file(s) failed, {} residual occurrence(s) remain",
            summary.errors.len(),
            summary.residual_count()
        );
    }
    Ok(())
}

fn print_summary(root: &Path, summary: &RunSummary) {
    let verb = if summary.dry_run { "Would modify" } else { "Modified" };
    println!(
        "{verb} {} of {} file(s) with '{}' in {}ms.",
        summary.total_modified, summary.total_scanned, summary.rule_set, summary.duration_ms
    );

    if !summary.modified.is_empty() {
        println!();
        let rows = summary
            .modified
            .iter()
            .map(|p| vec![paths::display_relative(root, p)])
            .collect();
        print_table(&["MODIFIED"], rows);
    }

    if !summary.errors.is_empty() {
        println!();
        let rows = summary
            .errors
            .iter()
            .map(|r| {
                vec![
                    paths::display_relative(root, &r.path),
                    r.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["FAILED", "ERROR"], rows);
    }

    for dir in &summary.skipped_dirs {
        println!("skipped unreadable: {}", paths::display_relative(root, dir));
    }

    match &summary.residuals {
        None => {}
        Some(residuals) if residuals.is_empty() => println!("\nVerify: no residual tokens."),
        Some(residuals) => {
            println!();
            super::verify::print_residuals(root, residuals);
        }
    }
}
