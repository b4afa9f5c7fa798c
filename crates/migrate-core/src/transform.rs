use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io;
use crate::manifest;
use crate::paths;
use crate::rules::RuleSet;
use crate::types::{FileKind, FileRecord};

/// Compute the migrated form of one file's text.
///
/// Returns `None` when the text has no trigger token or when every step left
/// it unchanged. Pure: nothing touches the filesystem.
pub fn rewrite_text(set: &RuleSet, path: &Path, kind: FileKind, text: &str) -> Result<Option<String>> {
    if !set.is_triggered(text) {
        return Ok(None);
    }

    let mut out = set.apply_rules(kind, text).into_owned();

    if kind == FileKind::Manifest {
        if let Some(policy) = &set.manifest {
            if let Some(edited) = manifest::rewrite(&out, policy, set.word.as_ref(), &set.safe_names)? {
                out = edited;
            }
        }
    } else if let Some(word) = set.word.as_ref().filter(|w| w.applies_to(kind)) {
        out = word.apply(&out, &set.safe_names).into_owned();
    }

    // Import repair runs last so imports produced by the rule table (e.g. a
    // converted globals import) are seen and never duplicated.
    if kind == FileKind::Source && paths::is_test_file(path) {
        if let Some(spec) = &set.import {
            if let Some(fixed) = spec.ensure(&out) {
                tracing::debug!(path = %path.display(), symbol = %spec.symbol, "added missing import");
                out = fixed;
            }
        }
    }

    Ok((out != text).then_some(out))
}

/// A file that has been read and rewritten in memory but not yet written.
#[derive(Debug)]
pub struct Pending {
    pub path: PathBuf,
    pub kind: FileKind,
    /// `None` when the file needs no change.
    pub content: Option<String>,
}

impl Pending {
    /// Write the new content back unless this is a dry run, and build the record.
    pub fn commit(self, dry_run: bool) -> FileRecord {
        let Pending { path, kind, content } = self;
        let Some(content) = content else {
            return FileRecord::unchanged(path, kind);
        };
        if !dry_run {
            if let Err(e) = io::atomic_write(&path, content.as_bytes()) {
                tracing::warn!(path = %path.display(), error = %e, "write failed");
                return FileRecord::failed(path, kind, e);
            }
        }
        FileRecord {
            path,
            kind,
            modified: true,
            error: None,
        }
    }
}

/// Read one file and compute its migrated form. Nothing touches the disk
/// beyond the read.
pub fn prepare(set: &RuleSet, path: &Path) -> Result<Pending> {
    let kind = FileKind::of(path);
    let text = io::read_text(path)?;
    let content = rewrite_text(set, path, kind, &text)?;
    Ok(Pending {
        path: path.to_path_buf(),
        kind,
        content,
    })
}

/// Read, rewrite, and write back a single file. Errors end up in the record.
pub fn transform_file(set: &RuleSet, path: &Path, dry_run: bool) -> FileRecord {
    match prepare(set, path) {
        Ok(pending) => pending.commit(dry_run),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "transform failed");
            FileRecord::failed(path.to_path_buf(), FileKind::of(path), e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{preset, JEST_TO_VITEST};
    use tempfile::TempDir;

    fn set() -> RuleSet {
        preset(JEST_TO_VITEST).unwrap()
    }

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let p = dir.path().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn scenario_mock_calls_and_import() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "src/a.test.js", "const mockFn = jest.fn(); jest.clearAllMocks();\n");

        let rec = transform_file(&set(), &p, false);
        assert!(rec.modified);
        assert!(rec.error.is_none());

        let out = std::fs::read_to_string(&p).unwrap();
        assert_eq!(
            out,
            "import { vi } from 'vitest';\nconst mockFn = vi.fn(); vi.clearAllMocks();\n"
        );
    }

    #[test]
    fn second_run_is_noop() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "src/b.spec.ts",
            "import { render } from './r';\njest.mock('./x');\nit('a', () => { jest.spyOn(a, 'b'); });\n",
        );
        assert!(transform_file(&set(), &p, false).modified);
        let first = std::fs::read_to_string(&p).unwrap();

        let rec = transform_file(&set(), &p, false);
        assert!(!rec.modified);
        assert_eq!(std::fs::read_to_string(&p).unwrap(), first);
        assert_eq!(first.matches("import { vi } from 'vitest'").count(), 1);
    }

    #[test]
    fn no_trigger_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let content = "export const add = (a, b) => a + b;\n";
        let p = write(&dir, "src/add.js", content);
        let before = std::fs::metadata(&p).unwrap().modified().unwrap();

        let rec = transform_file(&set(), &p, false);
        assert!(!rec.modified);
        assert_eq!(std::fs::read_to_string(&p).unwrap(), content);
        assert_eq!(std::fs::metadata(&p).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn non_test_source_gets_no_import() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "src/setup.js", "jest.fn();\n");
        transform_file(&set(), &p, false);
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "vi.fn();\n");
    }

    #[test]
    fn globals_import_not_duplicated() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "src/c.test.ts",
            "import { jest, expect } from '@jest/globals';\nconst m = jest.fn();\n",
        );
        transform_file(&set(), &p, false);
        let out = std::fs::read_to_string(&p).unwrap();
        assert_eq!(out, "import { vi, expect } from 'vitest';\nconst m = vi.fn();\n");
    }

    #[test]
    fn manifest_scenario() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "package.json",
            r#"{"devDependencies": {"jest": "29.0.0", "react": "18.0.0"}}"#,
        );
        let rec = transform_file(&set(), &p, false);
        assert!(rec.modified);
        assert_eq!(rec.kind, FileKind::Manifest);

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&p).unwrap()).unwrap();
        assert!(v["devDependencies"].get("jest").is_none());
        assert_eq!(v["devDependencies"]["react"], "18.0.0");
    }

    #[test]
    fn yaml_word_substitution() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            ".github/workflows/ci.yml",
            "steps:\n  - run: npx jest --ci\n  - run: npm i @testing-library/jest-dom\n",
        );
        transform_file(&set(), &p, false);
        assert_eq!(
            std::fs::read_to_string(&p).unwrap(),
            "steps:\n  - run: npx vitest --ci\n  - run: npm i @testing-library/jest-dom\n"
        );
    }

    #[test]
    fn dry_run_reports_but_does_not_write() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "a.test.js", "jest.fn();\n");
        let rec = transform_file(&set(), &p, true);
        assert!(rec.modified);
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "jest.fn();\n");
    }

    #[test]
    fn prepare_does_not_write() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "src/a.test.js", "jest.fn();\n");
        let pending = prepare(&set(), &p).unwrap();
        assert_eq!(pending.kind, FileKind::Source);
        assert!(pending.content.as_deref().unwrap().contains("vi.fn()"));
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "jest.fn();\n");

        assert!(pending.commit(false).modified);
        assert!(std::fs::read_to_string(&p).unwrap().contains("vi.fn()"));
    }

    #[test]
    fn missing_file_is_recorded_not_thrown() {
        let dir = TempDir::new().unwrap();
        let rec = transform_file(&set(), &dir.path().join("gone.test.js"), false);
        assert!(!rec.modified);
        assert!(rec.error.is_some());
    }
}
