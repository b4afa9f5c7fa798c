//! Built-in rule tables.
//!
//! Rules are ordered most-specific first and every replacement is written so
//! that its output cannot match any pattern in the table. That keeps a second
//! run over migrated code a no-op.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{MigrateError, Result};
use crate::imports::ImportSpec;
use crate::manifest::ManifestPolicy;
use crate::rules::{RewriteRule, RuleSet, WordSubstitution};
use crate::types::FileKind;

pub const JEST_TO_VITEST: &str = "jest-to-vitest";
pub const CUSTOM: &str = "custom";

pub fn names() -> &'static [&'static str] {
    &[JEST_TO_VITEST, CUSTOM]
}

pub fn preset(name: &str) -> Result<RuleSet> {
    match name {
        JEST_TO_VITEST => jest_to_vitest(),
        CUSTOM => Ok(RuleSet::builder(CUSTOM).build()),
        _ => Err(MigrateError::UnknownPreset(name.to_string())),
    }
}

// ---------------------------------------------------------------------------
// jest-to-vitest
// ---------------------------------------------------------------------------

const MOCK_APIS: &str = "fn|spyOn|mocked|isMockFunction|clearAllMocks|resetAllMocks|restoreAllMocks";
const MODULE_APIS: &str = "mock|unmock|doMock|doUnmock|resetModules";
const TIMER_APIS: &str = "useFakeTimers|useRealTimers|advanceTimersByTime|advanceTimersToNextTimer|\
runAllTimers|runOnlyPendingTimers|runAllTicks|clearAllTimers|getTimerCount|setSystemTime|getRealSystemTime";

/// Optional TypeScript type arguments, e.g. `jest.fn<() => number>()`.
const TYPE_ARGS: &str = r"(<[^;\n]*?>)?";

pub const JEST_OLD_PACKAGES: &[&str] = &[
    "jest",
    "ts-jest",
    "babel-jest",
    "@types/jest",
    "@jest/globals",
    "jest-environment-jsdom",
    "jest-environment-node",
    "jest-watch-typeahead",
    "jest-circus",
];

pub const JEST_SAFE_NAMES: &[&str] = &[
    "@testing-library/jest-dom",
    "jest-dom",
    "jest-axe",
    "jest-extended",
];

pub const VITEST_VERSION: &str = "^2.1.8";

fn jest_to_vitest() -> Result<RuleSet> {
    let mut builder = RuleSet::builder(JEST_TO_VITEST)
        .trigger("jest")
        .rules([
            RewriteRule::computed(
                "globals-import",
                r#"import(\s+type)?\s*\{([^}]*)\}\s*from\s*(['"])@jest/globals['"]"#,
                globals_import,
            )?
            .only(&[FileKind::Source, FileKind::Markdown]),
            RewriteRule::computed(
                "globals-require",
                r#"\{([^}]*)\}\s*=\s*require\(\s*(['"])@jest/globals['"]\s*\)"#,
                globals_require,
            )?
            .only(&[FileKind::Source, FileKind::Markdown]),
            RewriteRule::new(
                "globals-module",
                r#"(['"])@jest/globals['"]"#,
                "${1}vitest${1}",
            )?
            .only(&[FileKind::Source, FileKind::Markdown]),
            RewriteRule::new(
                "mock-factory-actual",
                r#"\bjest\.mock\((\s*['"][^'"\n]+['"]\s*,\s*)\(\)\s*=>\s*\(\{(\s*)\.\.\.jest\.requireActual\(([^()]*)\)"#,
                "vi.mock(${1}async () => ({${2}...(await vi.importActual(${3}))",
            )?,
            // Anywhere else `await` may land in a sync function, so only
            // unindented declarations are rewritten; the rest is left to verify.
            RewriteRule::new(
                "require-actual",
                r"(?m)^((?:const|let|var)\s+[^=\n]+=\s*)jest\.requireActual\(",
                "${1}await vi.importActual(",
            )?,
            RewriteRule::new(
                "require-mock",
                r"(?m)^((?:const|let|var)\s+[^=\n]+=\s*)jest\.requireMock\(",
                "${1}await vi.importMock(",
            )?,
            RewriteRule::new(
                "set-timeout",
                r"\bjest\.setTimeout\(\s*([^()]*?)\s*\)",
                "vi.setConfig({ testTimeout: ${1} })",
            )?,
            RewriteRule::new(
                "mock-functions",
                &format!(r"\bjest\.({MOCK_APIS}){TYPE_ARGS}\("),
                "vi.${1}${2}(",
            )?,
            RewriteRule::new(
                "module-mocks",
                &format!(r"\bjest\.({MODULE_APIS}){TYPE_ARGS}\("),
                "vi.${1}${2}(",
            )?,
            RewriteRule::new(
                "timers",
                &format!(r"\bjest\.({TIMER_APIS}){TYPE_ARGS}\("),
                "vi.${1}${2}(",
            )?,
            RewriteRule::new(
                "config-file",
                r"\bjest\.config\.(json|mjs|cjs|js|ts)\b",
                "vitest.config.${1}",
            )?,
        ])
        .import(ImportSpec::new("vitest", "vi", r"\bvi\.\w+")?)
        .manifest(ManifestPolicy {
            old_packages: JEST_OLD_PACKAGES.iter().map(|s| s.to_string()).collect(),
            rename_keys: vec![("jest".to_string(), "vitest".to_string())],
            add_dev_dependencies: vec![("vitest".to_string(), VITEST_VERSION.to_string())],
        })
        .word(WordSubstitution::new(
            "jest",
            "vitest",
            &[FileKind::Yaml, FileKind::Shell, FileKind::Manifest],
        ));

    for name in JEST_SAFE_NAMES {
        builder = builder.safe_name(*name);
    }
    Ok(builder.build())
}

fn jest_binding() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bjest\b").unwrap())
}

fn globals_import(caps: &Captures) -> String {
    let type_only = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let list = jest_binding().replace_all(&caps[2], "vi");
    let q = &caps[3];
    format!("import{type_only} {{{list}}} from {q}vitest{q}")
}

fn globals_require(caps: &Captures) -> String {
    let list = jest_binding().replace_all(&caps[1], "vi");
    let q = &caps[2];
    format!("{{{list}}} = require({q}vitest{q})")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
