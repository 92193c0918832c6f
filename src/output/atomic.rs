use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ReconError, Result};

/// Hidden temp file next to `path`, renamed over it once complete.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write `lines` newline-terminated to `path` so readers never observe a partial file.
///
/// The whole buffer goes to a hidden sibling first and is renamed into place.
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buf = String::new();
    let mut count = 0;
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push('\n');
        count += 1;
    }

    let tmp = temp_sibling(path);
    let written = File::create(&tmp).and_then(|mut f| {
        f.write_all(buf.as_bytes())?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(ReconError::io(path, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ReconError::io(path, e)
    })?;
    Ok(count)
}

/// Number of non-blank lines in `path`, or `None` if it cannot be read.
pub fn count_lines(path: &Path) -> Option<usize> {
    fs::read_to_string(path).ok().map(|s| s.lines().filter(|l| !l.trim().is_empty()).count())
}

/// True when `path` exists and holds at least one byte.
pub fn is_non_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}
