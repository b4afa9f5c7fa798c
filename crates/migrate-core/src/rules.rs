use regex::{Captures, Regex};
use std::borrow::Cow;

use crate::error::{MigrateError, Result};
use crate::imports::ImportSpec;
use crate::manifest::ManifestPolicy;
use crate::types::FileKind;

// ---------------------------------------------------------------------------
// Replacement
// ---------------------------------------------------------------------------

pub enum Replacement {
    /// Expanded with `$1` / `${name}` capture syntax.
    Template(String),
    Func(fn(&Captures) -> String),
}

impl std::fmt::Debug for Replacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacement::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Replacement::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl Replacement {
    /// Human-readable form for rule listings.
    pub fn describe(&self) -> &str {
        match self {
            Replacement::Template(t) => t,
            Replacement::Func(_) => "<computed>",
        }
    }
}

// ---------------------------------------------------------------------------
// RewriteRule
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RewriteRule {
    pub id: String,
    pub matcher: Regex,
    pub replacement: Replacement,
    /// File kinds the rule runs on. Empty means every kind.
    pub kinds: Vec<FileKind>,
}

impl RewriteRule {
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let matcher = compile(&id, pattern)?;
        Ok(Self {
            id,
            matcher,
            replacement: Replacement::Template(replacement.into()),
            kinds: Vec::new(),
        })
    }

    pub fn computed(
        id: impl Into<String>,
        pattern: &str,
        f: fn(&Captures) -> String,
    ) -> Result<Self> {
        let id = id.into();
        let matcher = compile(&id, pattern)?;
        Ok(Self {
            id,
            matcher,
            replacement: Replacement::Func(f),
            kinds: Vec::new(),
        })
    }

    pub fn only(mut self, kinds: &[FileKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn applies_to(&self, kind: FileKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.replacement {
            Replacement::Template(t) => self.matcher.replace_all(text, t.as_str()),
            Replacement::Func(f) => self.matcher.replace_all(text, |caps: &Captures| f(caps)),
        }
    }
}

fn compile(id: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| MigrateError::InvalidPattern {
        id: id.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// WordSubstitution
// ---------------------------------------------------------------------------

/// Whole-word rename used for CI YAML, shell scripts, and manifest scripts.
///
/// A match is left alone when it sits inside a safe name or looks like part
/// of a package name: preceded by `@`, `/` or `-`, or followed by `-` or `/`.
#[derive(Debug)]
pub struct WordSubstitution {
    pub from: String,
    pub to: String,
    pub kinds: Vec<FileKind>,
    matcher: Regex,
}

impl WordSubstitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kinds: &[FileKind]) -> Self {
        let from = from.into();
        let matcher = Regex::new(&format!(r"\b{}\b", regex::escape(&from)))
            .expect("escaped literal is a valid pattern");
        Self {
            from,
            to: to.into(),
            kinds: kinds.to_vec(),
            matcher,
        }
    }

    pub fn applies_to(&self, kind: FileKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn apply<'t>(&self, text: &'t str, safe_names: &[String]) -> Cow<'t, str> {
        let protected = safe_spans(text, safe_names);
        let bytes = text.as_bytes();
        let mut out = String::new();
        let mut last = 0;

        for m in self.matcher.find_iter(text) {
            let (start, end) = (m.start(), m.end());
            if protected.iter().any(|&(s, e)| start < e && end > s) {
                continue;
            }
            let before = start.checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(end).copied();
            if matches!(before, Some(b'@' | b'/' | b'-')) || matches!(after, Some(b'-' | b'/')) {
                continue;
            }
            out.push_str(&text[last..start]);
            out.push_str(&self.to);
            last = end;
        }

        if last == 0 {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

/// Byte ranges covered by any safe name.
fn safe_spans(text: &str, safe_names: &[String]) -> Vec<(usize, usize)> {
    safe_names
        .iter()
        .filter(|n| !n.is_empty())
        .flat_map(|name| {
            text.match_indices(name.as_str())
                .map(move |(i, s)| (i, i + s.len()))
        })
        .collect()
}

/// Blank out every safe name so trigger scans do not see it.
pub fn mask_safe_names<'t>(text: &'t str, safe_names: &[String]) -> Cow<'t, str> {
    let mut masked = Cow::Borrowed(text);
    for name in safe_names.iter().filter(|n| !n.is_empty()) {
        if masked.contains(name.as_str()) {
            masked = Cow::Owned(masked.replace(name.as_str(), &" ".repeat(name.len())));
        }
    }
    masked
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// One migration: the ordered rule table plus everything the transformer
/// needs to know about the target API.
#[derive(Debug)]
pub struct RuleSet {
    pub name: String,
    pub triggers: Vec<String>,
    pub rules: Vec<RewriteRule>,
    pub safe_names: Vec<String>,
    pub import: Option<ImportSpec>,
    pub manifest: Option<ManifestPolicy>,
    pub word: Option<WordSubstitution>,
}

impl RuleSet {
    pub fn builder(name: impl Into<String>) -> RuleSetBuilder {
        RuleSetBuilder {
            set: RuleSet {
                name: name.into(),
                triggers: Vec::new(),
                rules: Vec::new(),
                safe_names: Vec::new(),
                import: None,
                manifest: None,
                word: None,
            },
        }
    }

    /// Cheap pre-check: a file with no trigger token is never rewritten.
    pub fn is_triggered(&self, text: &str) -> bool {
        self.triggers.iter().any(|t| text.contains(t.as_str()))
    }

    /// Apply every rule that targets `kind`, in table order.
    pub fn apply_rules<'t>(&self, kind: FileKind, text: &'t str) -> Cow<'t, str> {
        let mut out = Cow::Borrowed(text);
        for rule in self.rules.iter().filter(|r| r.applies_to(kind)) {
            let changed = match rule.apply(&out) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(changed) = changed {
                tracing::trace!(rule = %rule.id, "rule matched");
                out = Cow::Owned(changed);
            }
        }
        out
    }

    /// True when no rule for `kind` changes `text`.
    pub fn is_stable(&self, kind: FileKind, text: &str) -> bool {
        self.apply_rules(kind, text).as_ref() == text
    }

    /// True when one more pass over the output of a first pass changes nothing.
    pub fn is_fixed_point(&self, kind: FileKind, sample: &str) -> bool {
        let once = self.apply_rules(kind, sample);
        self.is_stable(kind, &once)
    }

    /// Lines that still contain a trigger token once safe names are masked.
    pub fn residual_lines(&self, text: &str) -> Vec<(usize, String)> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| {
                let masked = mask_safe_names(line, &self.safe_names);
                self.triggers.iter().any(|t| masked.contains(t.as_str()))
            })
            .map(|(i, line)| (i + 1, line.trim().to_string()))
            .collect()
    }
}

pub struct RuleSetBuilder {
    set: RuleSet,
}

impl RuleSetBuilder {
    pub fn trigger(mut self, token: impl Into<String>) -> Self {
        self.set.triggers.push(token.into());
        self
    }

    pub fn rule(mut self, rule: RewriteRule) -> Self {
        self.set.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = RewriteRule>) -> Self {
        self.set.rules.extend(rules);
        self
    }

    pub fn safe_name(mut self, name: impl Into<String>) -> Self {
        self.set.safe_names.push(name.into());
        self
    }

    pub fn import(mut self, spec: ImportSpec) -> Self {
        self.set.import = Some(spec);
        self
    }

    pub fn manifest(mut self, policy: ManifestPolicy) -> Self {
        self.set.manifest = Some(policy);
        self
    }

    pub fn word(mut self, word: WordSubstitution) -> Self {
        self.set.word = Some(word);
        self
    }

    pub fn build(self) -> RuleSet {
        self.set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
