//! File enumeration.
//!
//! Depth-first walk of the project root that prunes excluded and hidden
//! directories and keeps files whose extension is on the allow-list.
//! Symlinks are never followed, so a symlinked directory cannot loop the walk.
//! The walk is best-effort: a directory that cannot be read is logged,
//! recorded in [`WalkResult::skipped`], and the walk moves on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::paths;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Directory and file names skipped wherever they appear.
    pub exclude: HashSet<String>,
    /// Lowercase extensions without the leading dot.
    pub extensions: HashSet<String>,
    /// Hidden directory names that are walked anyway.
    pub include_hidden: HashSet<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::new(
            paths::DEFAULT_EXCLUDE.iter().copied(),
            paths::DEFAULT_EXTENSIONS.iter().copied(),
            paths::DEFAULT_INCLUDE_HIDDEN.iter().copied(),
        )
    }
}

impl WalkOptions {
    pub fn new<E, X, H>(exclude: E, extensions: X, include_hidden: H) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        X: IntoIterator,
        X::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        Self {
            exclude: exclude.into_iter().map(|s| s.as_ref().to_string()).collect(),
            extensions: extensions
                .into_iter()
                .map(|s| s.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            include_hidden: include_hidden
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
        }
    }

    fn descend_into(&self, entry: &DirEntry) -> bool {
        // The root itself is always walked, whatever it is called.
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if self.exclude.contains(name.as_ref()) {
            return false;
        }
        if name.starts_with('.') && !self.include_hidden.contains(name.as_ref()) {
            return false;
        }
        true
    }

    fn wants_file(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.exclude.contains(name) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub fn enumerate(root: &Path, opts: &WalkOptions) -> WalkResult {
    let mut result = WalkResult::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| opts.descend_into(e));

    for entry in walker {
        match entry {
            Ok(entry) => {
                // The tool's own config names the preset and would always look unmigrated.
                let own_config = entry.depth() == 1 && entry.file_name() == paths::CONFIG_FILE;
                if entry.file_type().is_file() && !own_config && opts.wants_file(entry.path()) {
                    result.files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable path");
                result.skipped.push(path);
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        files = result.files.len(),
        skipped = result.skipped.len(),
        "enumeration finished"
    );
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
