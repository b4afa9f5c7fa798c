use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".migrate.yaml";
pub const MANIFEST_FILE: &str = "package.json";

/// Directory or file names; lockfiles list every old package by name.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "pnpm-lock.yaml",
];

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "json", "md", "yaml", "yml", "sh", "mjs", "cjs",
];

pub const DEFAULT_INCLUDE_HIDDEN: &[&str] = &[".github"];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Path relative to `root` for display; falls back to the full path.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ---------------------------------------------------------------------------
// Test-file detection
// ---------------------------------------------------------------------------

static TEST_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn test_file_re() -> &'static Regex {
    TEST_FILE_RE.get_or_init(|| {
        Regex::new(r"(^|/)__tests__/|\.(test|spec)\.[cm]?[jt]sx?$").unwrap()
    })
}

/// True for `*.test.*`, `*.spec.*`, and anything under a `__tests__/` directory.
pub fn is_test_file(path: &Path) -> bool {
    let normalized = path.to_string_lossy().replace('\\', "/");
    test_file_re().is_match(&normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_detected() {
        for p in [
            "src/a.test.js",
            "src/a.spec.ts",
            "src/Button.test.tsx",
            "lib/util.spec.mjs",
            "src/__tests__/helpers.js",
            "__tests__/x.ts",
        ] {
            assert!(is_test_file(Path::new(p)), "expected test file: {p}");
        }
    }

    #[test]
    fn non_test_files_rejected() {
        for p in ["src/a.js", "src/testing.ts", "jest.config.js", "README.md", "src/spec.ts"] {
            assert!(!is_test_file(Path::new(p)), "expected non-test file: {p}");
        }
    }

    #[test]
    fn relative_display() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            display_relative(root, Path::new("/tmp/proj/src/a.test.js")),
            "src/a.test.js"
        );
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.migrate.yaml")
        );
    }
}
