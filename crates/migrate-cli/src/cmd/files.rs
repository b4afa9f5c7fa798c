use migrate_core::batch;
use std::path::Path;

use crate::cmd::load_config;
use crate::output::print_json;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let files: Vec<String> = batch::plan(root, &config.walk_options())
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();

    if json {
        print_json(&files)?;
        return Ok(());
    }
    for f in &files {
        println!("{f}");
    }
    eprintln!("{} file(s)", files.len());
    Ok(())
}
