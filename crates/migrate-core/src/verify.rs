use std::path::PathBuf;

use crate::io;
use crate::rules::RuleSet;
use crate::types::Residual;

/// Re-scan `files` for trigger tokens that survived the migration.
///
/// This is a post-condition report, not a guarantee: unreadable files are
/// skipped and safe names are ignored.
pub fn scan(set: &RuleSet, files: &[PathBuf]) -> Vec<Residual> {
    let mut residuals = Vec::new();
    for path in files {
        let text = match io::read_text(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "verify: skipping unreadable file");
                continue;
            }
        };
        for (line, snippet) in set.residual_lines(&text) {
            residuals.push(Residual {
                path: path.clone(),
                line,
                text: snippet,
            });
        }
    }
    residuals
}
