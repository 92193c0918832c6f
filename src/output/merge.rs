use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::output::subdomain_set::SubdomainSet;

/// What a merge read and wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub read: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub unique: usize,
}

/// Union the lines of every readable candidate into `output`, sorted and deduplicated.
///
/// Missing or unreadable candidates are logged and skipped. Failing to write `output`
/// is an error: every later stage reads it.
pub fn merge_files(candidates: &[PathBuf], output: &Path) -> Result<MergeSummary> {
    let mut set = SubdomainSet::new();
    let mut summary = MergeSummary::default();

    for path in candidates {
        match std::fs::read(path) {
            Ok(bytes) => {
                let added = set.extend_lines(&String::from_utf8_lossy(&bytes));
                tracing::debug!(path=%path.display(), added, "merged partial result");
                summary.read.push(path.clone());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path=%path.display(), "partial result missing; skipping");
                summary.skipped.push(path.clone());
            }
            Err(e) => {
                tracing::warn!(path=%path.display(), error=%e, "partial result unreadable; skipping");
                summary.skipped.push(path.clone());
            }
        }
    }

    summary.unique = set.write_to(output)?;
    Ok(summary)
}
