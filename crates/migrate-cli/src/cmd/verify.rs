use anyhow::Context;
use migrate_core::{paths, types::Residual, verify, walk};
use std::path::Path;

use crate::cmd::load_config;
use crate::output::{print_json, print_table};

pub fn run(root: &Path, strict: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let strict = strict || config.strict;
    let set = config.rule_set().context("cannot build rule set")?;

    let walked = walk::enumerate(root, &config.walk_options());
    let residuals = verify::scan(&set, &walked.files);

    if json {
        let value = serde_json::json!({
            "scanned": walked.files.len(),
            "residuals": residuals,
        });
        print_json(&value)?;
    } else if residuals.is_empty() {
        println!("No residual tokens in {} file(s).", walked.files.len());
    } else {
        print_residuals(root, &residuals);
    }

    if strict && !residuals.is_empty() {
        anyhow::bail!("{} residual occurrence(s) remain", residuals.len());
    }
    Ok(())
}

pub fn print_residuals(root: &Path, residuals: &[Residual]) {
    let rows = residuals
        .iter()
        .map(|r| {
            vec![
                paths::display_relative(root, &r.path),
                r.line.to_string(),
                r.text.clone(),
            ]
        })
        .collect();
    print_table(&["RESIDUAL", "LINE", "TEXT"], rows);
}
