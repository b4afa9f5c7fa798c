use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `MIGRATE_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.migrate.yaml`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd)
}

fn find_root(start: &Path) -> PathBuf {
    let marked = |marker: fn(&Path) -> bool| {
        start.ancestors().find(|dir| marker(dir)).map(Path::to_path_buf)
    };
    marked(|d| migrate_core::paths::config_path(d).is_file())
        .or_else(|| marked(|d| d.join(".git").is_dir()))
        .unwrap_or_else(|| start.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn config_file_beats_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let app = dir.path().join("packages/app");
        std::fs::create_dir_all(app.join("src/deep")).unwrap();
        std::fs::write(app.join(".migrate.yaml"), "chunk_size: 5\n").unwrap();

        assert_eq!(find_root(&app.join("src/deep")), app);
    }

    #[test]
    fn falls_back_to_git_then_start() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_root(&deep), dir.path());

        let bare = TempDir::new().unwrap();
        let found = find_root(bare.path());
        // A .git or .migrate.yaml above the temp dir would win; otherwise the start.
        assert!(bare.path().starts_with(&found));
    }
}
