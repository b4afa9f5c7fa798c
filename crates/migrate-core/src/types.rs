use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths;

// ---------------------------------------------------------------------------
// FileKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Source,
    Manifest,
    Json,
    Yaml,
    Markdown,
    Shell,
    Text,
}

impl FileKind {
    pub fn all() -> &'static [FileKind] {
        &[
            FileKind::Source,
            FileKind::Manifest,
            FileKind::Json,
            FileKind::Yaml,
            FileKind::Markdown,
            FileKind::Shell,
            FileKind::Text,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Manifest => "manifest",
            FileKind::Json => "json",
            FileKind::Yaml => "yaml",
            FileKind::Markdown => "markdown",
            FileKind::Shell => "shell",
            FileKind::Text => "text",
        }
    }

    /// Classify a path by file name and extension. Anything the enumerator
    /// let through that is not otherwise recognised is plain `Text`.
    pub fn of(path: &Path) -> FileKind {
        if path.file_name().and_then(|n| n.to_str()) == Some(paths::MANIFEST_FILE) {
            return FileKind::Manifest;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "mts" | "cts" => FileKind::Source,
            "json" => FileKind::Json,
            "yaml" | "yml" => FileKind::Yaml,
            "md" | "mdx" => FileKind::Markdown,
            "sh" | "bash" => FileKind::Shell,
            _ => FileKind::Text,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// Outcome of transforming one file. An errored file is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub kind: FileKind,
    pub modified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    pub fn unchanged(path: PathBuf, kind: FileKind) -> Self {
        Self {
            path,
            kind,
            modified: false,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, kind: FileKind, error: impl fmt::Display) -> Self {
        Self {
            path,
            kind,
            modified: false,
            error: Some(error.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Residual
// ---------------------------------------------------------------------------

/// A trigger token that survived the migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    pub path: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub rule_set: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub total_scanned: usize,
    pub total_modified: usize,
    pub modified: Vec<PathBuf>,
    pub errors: Vec<FileRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_dirs: Vec<PathBuf>,
    /// `None` when the verification pass was not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residuals: Option<Vec<Residual>>,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn residual_count(&self) -> usize {
        self.residuals.as_ref().map(|r| r.len()).unwrap_or(0)
    }

    /// True when nothing errored and verification (if run) found nothing.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && self.residual_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_paths() {
        assert_eq!(FileKind::of(Path::new("src/a.test.ts")), FileKind::Source);
        assert_eq!(FileKind::of(Path::new("lib/b.cjs")), FileKind::Source);
        assert_eq!(FileKind::of(Path::new("package.json")), FileKind::Manifest);
        assert_eq!(
            FileKind::of(Path::new("packages/ui/package.json")),
            FileKind::Manifest
        );
        assert_eq!(FileKind::of(Path::new("tsconfig.json")), FileKind::Json);
        assert_eq!(FileKind::of(Path::new(".github/workflows/ci.yml")), FileKind::Yaml);
        assert_eq!(FileKind::of(Path::new("README.md")), FileKind::Markdown);
        assert_eq!(FileKind::of(Path::new("scripts/test.sh")), FileKind::Shell);
        assert_eq!(FileKind::of(Path::new("src/App.vue")), FileKind::Text);
    }

    #[test]
    fn file_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FileKind::Manifest).unwrap();
        assert_eq!(json, "\"manifest\"");
        let parsed: FileKind = serde_yaml::from_str("shell").unwrap();
        assert_eq!(parsed, FileKind::Shell);
    }

    #[test]
    fn record_error_omitted_when_none() {
        let rec = FileRecord::unchanged(PathBuf::from("a.js"), FileKind::Source);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("error"));

        let failed = FileRecord::failed(PathBuf::from("b.js"), FileKind::Source, "denied");
        assert!(!failed.modified);
        assert_eq!(failed.error.as_deref(), Some("denied"));
    }
}
