use crate::batch::{DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::error::{MigrateError, Result};
use crate::paths;
use crate::presets;
use crate::rules::{RewriteRule, RuleSet};
use crate::types::FileKind;
use crate::walk::WalkOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CustomRule
// ---------------------------------------------------------------------------

/// A project-specific rule appended after the preset's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomRule {
    pub id: String,
    pub pattern: String,
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<FileKind>,
}

impl CustomRule {
    pub fn compile(&self) -> Result<RewriteRule> {
        Ok(RewriteRule::new(&self.id, &self.pattern, &self.replacement)?.only(&self.kinds))
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_include_hidden")]
    pub include_hidden: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Per-file timeout; `0` disables it.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_verify")]
    pub verify: bool,
    /// Extra trigger tokens on top of the preset's.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<CustomRule>,
}

fn default_version() -> u32 {
    1
}

fn default_preset() -> String {
    presets::JEST_TO_VITEST.to_string()
}

fn default_exclude() -> Vec<String> {
    paths::DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_extensions() -> Vec<String> {
    paths::DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_include_hidden() -> Vec<String> {
    paths::DEFAULT_INCLUDE_HIDDEN
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_verify() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            preset: default_preset(),
            exclude: default_exclude(),
            extensions: default_extensions(),
            include_hidden: default_include_hidden(),
            chunk_size: default_chunk_size(),
            timeout_seconds: default_timeout(),
            strict: false,
            verify: default_verify(),
            triggers: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load `.migrate.yaml` from `root`, or defaults when there is none.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions::new(&self.exclude, &self.extensions, &self.include_hidden)
    }

    /// The preset's table followed by the custom rules, in file order.
    pub fn rule_set(&self) -> Result<RuleSet> {
        let base = presets::preset(&self.preset)?;
        let custom = self
            .rules
            .iter()
            .map(CustomRule::compile)
            .collect::<Result<Vec<_>>>()?;

        let mut set = base;
        set.rules.extend(custom);
        for t in &self.triggers {
            if !set.triggers.contains(t) {
                set.triggers.push(t.clone());
            }
        }
        if set.triggers.is_empty() {
            return Err(MigrateError::InvalidConfig(format!(
                "preset '{}' has no trigger tokens; add some under 'triggers'",
                self.preset
            )));
        }
        Ok(set)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };
        let warning = |message: String| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        };

        // 1. Preset must exist
        if !presets::names().contains(&self.preset.as_str()) {
            warnings.push(error(format!(
                "unknown preset '{}' (known: {})",
                self.preset,
                presets::names().join(", ")
            )));
        } else if self.preset == presets::CUSTOM && self.triggers.is_empty() {
            warnings.push(error(
                "preset 'custom' needs at least one entry in 'triggers'".to_string(),
            ));
        }

        // 2. Driver settings
        if self.chunk_size == 0 {
            warnings.push(error("chunk_size must be at least 1".to_string()));
        } else if self.chunk_size > 256 {
            warnings.push(warning(format!(
                "chunk_size={} keeps that many files open at once (>256 is unusual)",
                self.chunk_size
            )));
        }
        if self.timeout_seconds == 0 {
            warnings.push(warning(
                "timeout_seconds=0 disables the per-file timeout".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            warnings.push(error(
                "extensions is empty; no file would be processed".to_string(),
            ));
        }
        if self.exclude.iter().any(|d| d.trim().is_empty()) {
            warnings.push(warning("exclude contains an empty name".to_string()));
        }

        // 3. Custom rules compile, have unique ids, and leave their own output alone
        let full = self.rule_set().ok();
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                warnings.push(warning(format!("duplicate rule id '{}'", rule.id)));
            }
            let compiled = match rule.compile() {
                Ok(compiled) => compiled,
                Err(e) => {
                    warnings.push(error(e.to_string()));
                    continue;
                }
            };
            let sample = strip_capture_refs(&rule.replacement);
            if sample.is_empty() {
                continue;
            }
            // Whatever the rule writes is input to the next run; every rule
            // in the set must leave it alone.
            let kind = compiled.kinds.first().copied().unwrap_or(FileKind::Text);
            let stable = match &full {
                Some(set) => set.is_stable(kind, &sample),
                None => RuleSet::builder(&rule.id)
                    .rule(compiled)
                    .build()
                    .is_stable(kind, &sample),
            };
            if !stable {
                warnings.push(warning(format!(
                    "rule '{}' rewrites its own output; a second run would change files again",
                    rule.id
                )));
            }
        }

        warnings
    }
}

/// Replacement text with `$1` / `${name}` references removed.
fn strip_capture_refs(template: &str) -> String {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"\$(\{[^}]*\}|[0-9A-Za-z_]+)").unwrap());
    re.replace_all(template, "").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.preset, "jest-to-vitest");
        assert_eq!(parsed.chunk_size, 10);
        assert_eq!(parsed.version, 1);
        assert!(!yaml.contains("rules"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.timeout_seconds, 30);
        assert!(cfg.verify);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.chunk_size = 4;
        cfg.strict = true;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.chunk_size, 4);
        assert!(loaded.strict);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "chunk_size: 20\nexclude: [node_modules, vendor]\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.chunk_size, 20);
        assert_eq!(cfg.exclude, vec!["node_modules", "vendor"]);
        assert_eq!(cfg.preset, "jest-to-vitest");
        assert!(cfg.extensions.contains(&"ts".to_string()));
    }

    #[test]
    fn custom_rules_appended_after_preset() {
        let yaml = r#"
rules:
  - id: expect-extend
    pattern: 'jest\.extend\('
    replacement: 'expect.extend('
    kinds: [source]
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let set = cfg.rule_set().unwrap();
        assert_eq!(set.rules.last().unwrap().id, "expect-extend");
        assert_eq!(set.rules.last().unwrap().kinds, vec![FileKind::Source]);
    }

    #[test]
    fn custom_rule_rejects_unknown_fields() {
        let yaml = "rules:\n  - id: a\n    pattern: b\n    replacment: c\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn custom_preset_needs_triggers() {
        let mut cfg = Config::default();
        cfg.preset = "custom".to_string();
        assert!(cfg.rule_set().is_err());
        assert!(cfg.validate().iter().any(|w| w.level == WarnLevel::Error));

        cfg.triggers = vec!["enzyme".to_string()];
        let set = cfg.rule_set().unwrap();
        assert_eq!(set.triggers, vec!["enzyme"]);
    }

    #[test]
    fn validate_default_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_unknown_preset() {
        let mut cfg = Config::default();
        cfg.preset = "mocha".to_string();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("unknown preset 'mocha'")));
    }

    #[test]
    fn validate_zero_chunk_size_is_error() {
        let mut cfg = Config::default();
        cfg.chunk_size = 0;
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("chunk_size")));
    }

    #[test]
    fn validate_bad_pattern_is_error() {
        let mut cfg = Config::default();
        cfg.rules.push(CustomRule {
            id: "broken".to_string(),
            pattern: "(oops".to_string(),
            replacement: "x".to_string(),
            kinds: vec![],
        });
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("broken")));
    }

    #[test]
    fn validate_self_feeding_rule_warns() {
        let mut cfg = Config::default();
        cfg.rules.push(CustomRule {
            id: "grow".to_string(),
            pattern: r"foo".to_string(),
            replacement: "foofoo".to_string(),
            kinds: vec![],
        });
        cfg.rules.push(CustomRule {
            id: "grow".to_string(),
            pattern: r"\bbar\(".to_string(),
            replacement: "baz(".to_string(),
            kinds: vec![],
        });
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("'grow' rewrites its own output")));
        assert!(warnings.iter().any(|w| w.message.contains("duplicate rule id")));
    }

    #[test]
    fn validate_rule_fed_by_preset_warns() {
        let mut cfg = Config::default();
        cfg.rules.push(CustomRule {
            id: "back-to-jest".to_string(),
            pattern: r"\bsinon\.stub\(".to_string(),
            replacement: "jest.fn(".to_string(),
            kinds: vec![FileKind::Source],
        });
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("'back-to-jest' rewrites its own output")));

        cfg.rules[0].replacement = "vi.fn(".to_string();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn capture_refs_stripped() {
        assert_eq!(strip_capture_refs("vi.${1}(x$2)"), "vi.(x)");
    }
}
