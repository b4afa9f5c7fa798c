//! `package.json` editing.
//!
//! The structured path parses the manifest (key order preserved), drops old
//! tool packages from every dependency table, renames the tool's config key,
//! renames the tool in `scripts`, and adds replacement dev-dependencies. The
//! manifest is only re-serialized when one of those edits happened, so an
//! untouched manifest keeps its original formatting byte for byte.
//!
//! A manifest that does not parse falls back to line-level edits followed by
//! trailing-comma cleanup.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::rules::WordSubstitution;

pub const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

#[derive(Debug, Clone, Default)]
pub struct ManifestPolicy {
    /// Packages removed from every dependency table.
    pub old_packages: Vec<String>,
    /// Top-level keys renamed `(from, to)`, e.g. the tool's config block.
    pub rename_keys: Vec<(String, String)>,
    /// `(name, version)` added to `devDependencies` when an old package was
    /// removed and the name is not already declared.
    pub add_dev_dependencies: Vec<(String, String)>,
}

impl ManifestPolicy {
    fn is_old(&self, name: &str) -> bool {
        self.old_packages.iter().any(|p| p == name)
    }
}

/// Returns the rewritten manifest, or `None` when nothing changed.
pub fn rewrite(
    text: &str,
    policy: &ManifestPolicy,
    scripts_word: Option<&WordSubstitution>,
    safe_names: &[String],
) -> Result<Option<String>> {
    let mut root = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Ok(None),
        Err(e) => {
            tracing::warn!(error = %e, "manifest is not valid JSON; falling back to line edits");
            return Ok(rewrite_lines(text, policy));
        }
    };

    let mut changed = false;

    let mut removed = Vec::new();
    for section in DEPENDENCY_SECTIONS {
        if let Some(Value::Object(deps)) = root.get_mut(*section) {
            let doomed: Vec<String> = deps.keys().filter(|k| policy.is_old(k)).cloned().collect();
            for name in doomed {
                deps.shift_remove(&name);
                removed.push(name);
            }
        }
    }
    if !removed.is_empty() {
        tracing::debug!(removed = ?removed, "removed old packages");
        changed = true;
    }

    for (from, to) in &policy.rename_keys {
        if root.contains_key(from) && !root.contains_key(to) {
            root = rename_key(root, from, to);
            changed = true;
        }
    }

    if let (Some(word), Some(Value::Object(scripts))) = (scripts_word, root.get_mut("scripts")) {
        for value in scripts.values_mut() {
            if let Value::String(cmd) = value {
                let renamed = word.apply(cmd, safe_names).into_owned();
                if renamed != *cmd {
                    *cmd = renamed;
                    changed = true;
                }
            }
        }
    }

    if !removed.is_empty() {
        for (name, version) in &policy.add_dev_dependencies {
            if is_declared(&root, name) {
                continue;
            }
            let dev = root
                .entry("devDependencies")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(dev) = dev {
                dev.insert(name.clone(), Value::String(version.clone()));
                changed = true;
            }
        }
    }

    if !changed {
        return Ok(None);
    }

    let mut out = to_pretty(&Value::Object(root), &detect_indent(text))?;
    if text.ends_with('\n') {
        out.push('\n');
    }
    Ok(Some(out))
}

fn is_declared(root: &Map<String, Value>, name: &str) -> bool {
    DEPENDENCY_SECTIONS.iter().any(|section| {
        root.get(*section)
            .and_then(Value::as_object)
            .map(|deps| deps.contains_key(name))
            .unwrap_or(false)
    })
}

/// Rename a key in place, keeping its position.
fn rename_key(map: Map<String, Value>, from: &str, to: &str) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| if k == from { (to.to_string(), v) } else { (k, v) })
        .collect()
}

fn detect_indent(text: &str) -> String {
    text.lines()
        .skip(1)
        .find(|l| !l.trim().is_empty())
        .map(|l| {
            l.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

fn to_pretty(value: &Value, indent: &str) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ---------------------------------------------------------------------------
// Fallback for manifests that do not parse
// ---------------------------------------------------------------------------

fn rewrite_lines(text: &str, policy: &ManifestPolicy) -> Option<String> {
    let mut out = text.to_string();

    for name in &policy.old_packages {
        let pattern = format!(
            r#"(?m)^[ \t]*"{}"[ \t]*:[ \t]*"[^"\n]*"[ \t]*,?[ \t]*\r?\n?"#,
            regex::escape(name)
        );
        if let Ok(re) = Regex::new(&pattern) {
            out = re.replace_all(&out, "").into_owned();
        }
    }

    for (from, to) in &policy.rename_keys {
        let pattern = format!(r#""{}"(\s*:\s*\{{)"#, regex::escape(from));
        if let Ok(re) = Regex::new(&pattern) {
            out = re
                .replace_all(&out, format!("\"{to}\"${{1}}").as_str())
                .into_owned();
        }
    }

    if out == text {
        return None;
    }
    Some(normalize_trailing_commas(&out))
}

/// Drop commas left dangling before a closing brace or bracket.
pub fn normalize_trailing_commas(text: &str) -> String {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap());
    re.replace_all(text, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
