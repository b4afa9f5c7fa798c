//! Import hygiene for test files.
//!
//! After the rule table rewrites `jest.fn()` into `vi.fn()`, a test file that
//! never imported `vi` is broken unless the project runs with globals on.
//! [`ImportSpec::ensure`] adds the missing symbol exactly once: it is merged
//! into an existing named import from the module when there is one, otherwise
//! a new statement goes after the last import (or `require`) or at the top.

use regex::Regex;

use crate::error::{MigrateError, Result};

#[derive(Debug)]
pub struct ImportSpec {
    pub module: String,
    pub symbol: String,
    usage: Regex,
    imported: Regex,
    named_import: Regex,
}

impl ImportSpec {
    /// `usage` is a pattern that matches a use of `symbol` in code.
    pub fn new(module: impl Into<String>, symbol: impl Into<String>, usage: &str) -> Result<Self> {
        let module = module.into();
        let symbol = symbol.into();
        let m = regex::escape(&module);
        let s = regex::escape(&symbol);

        let invalid = |source| MigrateError::InvalidPattern {
            id: format!("import:{module}"),
            source,
        };
        let usage = Regex::new(usage).map_err(invalid)?;
        let imported = Regex::new(&format!(
            r#"import\s*\{{[^}}]*\b{s}\b[^}}]*\}}\s*from\s*['"]{m}['"]|\{{[^}}]*\b{s}\b[^}}]*\}}\s*=\s*require\(\s*['"]{m}['"]\s*\)"#
        ))
        .map_err(invalid)?;
        let named_import = Regex::new(&format!(
            r#"import\s*\{{([^}}]*)\}}\s*from\s*['"]{m}['"]"#
        ))
        .map_err(invalid)?;

        Ok(Self {
            module,
            symbol,
            usage,
            imported,
            named_import,
        })
    }

    pub fn is_used(&self, text: &str) -> bool {
        self.usage.is_match(text)
    }

    pub fn is_imported(&self, text: &str) -> bool {
        self.imported.is_match(text)
    }

    /// Returns the repaired text, or `None` when nothing needs to change.
    pub fn ensure(&self, text: &str) -> Option<String> {
        if !self.is_used(text) || self.is_imported(text) {
            return None;
        }
        if let Some(merged) = self.merge_into_existing(text) {
            return Some(merged);
        }

        if let Some(last) = last_import_re().find_iter(text).last() {
            let stmt = self.esm_statement(last.as_str());
            return Some(insert_after(text, last.end(), &stmt));
        }
        if let Some(last) = last_require_re().find_iter(text).last() {
            let stmt = self.cjs_statement(last.as_str());
            return Some(insert_after(text, last.end(), &stmt));
        }

        let stmt = self.esm_statement("");
        Some(insert_at_top(text, &stmt))
    }

    fn merge_into_existing(&self, text: &str) -> Option<String> {
        let caps = self.named_import.captures(text)?;
        let list = caps.get(1)?;
        let inner = list.as_str();
        let body = inner.trim_end();
        let trailing = &inner[body.len()..];

        let merged = if body.trim().is_empty() {
            format!(" {} ", self.symbol)
        } else if body.ends_with(',') {
            format!("{body} {},{trailing}", self.symbol)
        } else {
            format!("{body}, {}{trailing}", self.symbol)
        };

        let mut out = String::with_capacity(text.len() + self.symbol.len() + 2);
        out.push_str(&text[..list.start()]);
        out.push_str(&merged);
        out.push_str(&text[list.end()..]);
        Some(out)
    }

    /// Copy quote style and semicolon use from a neighbouring statement.
    fn esm_statement(&self, neighbour: &str) -> String {
        let (q, semi) = style_of(neighbour);
        format!("import {{ {} }} from {q}{}{q}{semi}", self.symbol, self.module)
    }

    fn cjs_statement(&self, neighbour: &str) -> String {
        let (q, semi) = style_of(neighbour);
        format!(
            "const {{ {} }} = require({q}{}{q}){semi}",
            self.symbol, self.module
        )
    }
}

fn style_of(stmt: &str) -> (char, &'static str) {
    let q = if stmt.contains('"') && !stmt.contains('\'') {
        '"'
    } else {
        '\''
    };
    let semi = if stmt.is_empty() || stmt.trim_end().ends_with(';') {
        ";"
    } else {
        ""
    };
    (q, semi)
}

fn insert_after(text: &str, at: usize, stmt: &str) -> String {
    let mut out = String::with_capacity(text.len() + stmt.len() + 1);
    out.push_str(&text[..at]);
    out.push('\n');
    out.push_str(stmt);
    out.push_str(&text[at..]);
    out
}

fn insert_at_top(text: &str, stmt: &str) -> String {
    let mut at = 0;
    // Keep a shebang on the first line.
    if text.starts_with("#!") {
        at = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    }
    // A directive prologue ('use strict') only counts while it leads the file.
    while let Some(m) = directive_re().find(&text[at..]) {
        at += m.end();
    }
    let (head, rest) = text.split_at(at);
    let sep = if head.is_empty() || head.ends_with('\n') { "" } else { "\n" };
    format!("{head}{sep}{stmt}\n{rest}")
}

fn directive_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\A[ \t]*(?:'[^'\n]*'|"[^"\n]*")[ \t]*;?[ \t]*(?:\r?\n|\z)"#).unwrap()
    })
}

fn last_import_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^import[\s{*][^;'"]*?(?:from\s*)?['"][^'"\n]+['"][ \t]*;?"#).unwrap()
    })
}

fn last_require_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?:const|let|var)\s+[^=\n]+=\s*require\(\s*['"][^'"\n]+['"]\s*\)[ \t]*;?"#,
        )
        .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vi_spec() -> ImportSpec {
        ImportSpec::new("vitest", "vi", r"\bvi\.\w+").unwrap()
    }

    #[test]
    fn unused_symbol_needs_nothing() {
        assert!(vi_spec().ensure("expect(1).toBe(1);\n").is_none());
    }

    #[test]
    fn inserts_after_last_import() {
        let text = "import React from 'react';\nimport { render } from '@testing-library/react';\n\nconst m = vi.fn();\n";
        let out = vi_spec().ensure(text).unwrap();
        assert_eq!(
            out,
            "import React from 'react';\nimport { render } from '@testing-library/react';\nimport { vi } from 'vitest';\n\nconst m = vi.fn();\n"
        );
    }

    #[test]
    fn follows_quote_and_semicolon_style() {
        let text = "import x from \"x\"\nvi.fn()\n";
        let out = vi_spec().ensure(text).unwrap();
        assert!(out.starts_with("import x from \"x\"\nimport { vi } from \"vitest\"\n"));
    }

    #[test]
    fn handles_multiline_import() {
        let text = "import {\n  a,\n  b,\n} from './mod';\nvi.spyOn(a, 'b');\n";
        let out = vi_spec().ensure(text).unwrap();
        assert!(out.contains("} from './mod';\nimport { vi } from 'vitest';\nvi.spyOn"));
    }

    #[test]
    fn merges_into_existing_vitest_import() {
        let text = "import { describe, it } from 'vitest';\nit('x', () => vi.fn());\n";
        let out = vi_spec().ensure(text).unwrap();
        assert_eq!(
            out,
            "import { describe, it, vi } from 'vitest';\nit('x', () => vi.fn());\n"
        );
        assert_eq!(out.matches("from 'vitest'").count(), 1);
    }

    #[test]
    fn merges_into_trailing_comma_list() {
        let text = "import {\n  describe,\n  it,\n} from 'vitest';\nvi.fn();\n";
        let out = vi_spec().ensure(text).unwrap();
        assert!(out.contains("  it, vi,\n} from 'vitest'"));
    }

    #[test]
    fn commonjs_file_gets_require() {
        let text = "const path = require('path');\n\ntest('x', () => { vi.fn(); });\n";
        let out = vi_spec().ensure(text).unwrap();
        assert!(out.starts_with("const path = require('path');\nconst { vi } = require('vitest');\n"));
    }

    #[test]
    fn no_imports_goes_to_top_after_shebang() {
        let out = vi_spec().ensure("vi.fn();\n").unwrap();
        assert_eq!(out, "import { vi } from 'vitest';\nvi.fn();\n");

        let out = vi_spec().ensure("#!/usr/bin/env node\nvi.fn();\n").unwrap();
        assert_eq!(out, "#!/usr/bin/env node\nimport { vi } from 'vitest';\nvi.fn();\n");
    }

    #[test]
    fn directive_prologue_stays_first() {
        let out = vi_spec().ensure("'use strict';\nconst m = vi.fn();\n").unwrap();
        assert_eq!(out, "'use strict';\nimport { vi } from 'vitest';\nconst m = vi.fn();\n");

        let out = vi_spec()
            .ensure("#!/usr/bin/env node\n\"use strict\"\nvi.fn();\n")
            .unwrap();
        assert_eq!(
            out,
            "#!/usr/bin/env node\n\"use strict\"\nimport { vi } from 'vitest';\nvi.fn();\n"
        );
    }

    #[test]
    fn string_call_on_first_line_is_not_a_directive() {
        let out = vi_spec().ensure("'a'.repeat(2);\nvi.fn();\n").unwrap();
        assert!(out.starts_with("import { vi } from 'vitest';\n'a'.repeat(2);"));
    }

    #[test]
    fn second_pass_does_not_duplicate() {
        let spec = vi_spec();
        let once = spec.ensure("import a from 'a';\nvi.fn();\n").unwrap();
        assert!(spec.ensure(&once).is_none());
        assert_eq!(once.matches("import { vi } from 'vitest'").count(), 1);
    }

    #[test]
    fn existing_require_counts_as_imported() {
        let text = "const { vi, expect } = require('vitest');\nvi.fn();\n";
        assert!(vi_spec().ensure(text).is_none());
    }
}
