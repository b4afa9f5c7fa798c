use anyhow::Context;
use migrate_core::rules::RuleSet;
use std::path::Path;

use crate::cmd::load_config;
use crate::output::{print_json, print_table};

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let set = config.rule_set().context("cannot build rule set")?;

    if json {
        print_json(&describe(&set))?;
        return Ok(());
    }

    println!("Rule set: {} (triggers: {})", set.name, set.triggers.join(", "));
    println!();
    let rows = set
        .rules
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                kinds_label(&r.kinds),
                r.matcher.as_str().to_string(),
                r.replacement.describe().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "KINDS", "PATTERN", "REPLACEMENT"], rows);

    if !set.safe_names.is_empty() {
        println!("\nSafe names: {}", set.safe_names.join(", "));
    }
    if let Some(spec) = &set.import {
        println!("Import: {{ {} }} from '{}'", spec.symbol, spec.module);
    }
    if let Some(word) = &set.word {
        println!(
            "Word substitution: {} -> {} ({})",
            word.from,
            word.to,
            kinds_label(&word.kinds)
        );
    }
    Ok(())
}

fn kinds_label(kinds: &[migrate_core::types::FileKind]) -> String {
    if kinds.is_empty() {
        return "all".to_string();
    }
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn describe(set: &RuleSet) -> serde_json::Value {
    let rules: Vec<serde_json::Value> = set
        .rules
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "pattern": r.matcher.as_str(),
                "replacement": r.replacement.describe(),
                "kinds": r.kinds,
            })
        })
        .collect();
    serde_json::json!({
        "name": set.name,
        "triggers": set.triggers,
        "rules": rules,
        "safe_names": set.safe_names,
        "import": set.import.as_ref().map(|s| serde_json::json!({
            "module": s.module,
            "symbol": s.symbol,
        })),
        "manifest": set.manifest.as_ref().map(|m| serde_json::json!({
            "old_packages": m.old_packages,
            "rename_keys": m.rename_keys,
            "add_dev_dependencies": m.add_dev_dependencies,
        })),
    })
}
