use std::io::ErrorKind;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ReconError, Result};
use crate::output::atomic;

/// CSI sequences (colors, cursor movement) and two-byte escapes.
static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("ANSI regex is valid")
});

/// One cleaned line of liveness-probe output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub line: String,
    pub status: u16,
}

impl ProbeRecord {
    /// Clean a raw line. Returns `None` when nothing is left.
    ///
    /// A missing or non-numeric second field is status 0.
    pub fn parse(raw: &str) -> Option<Self> {
        let line = strip_brackets(&strip_ansi(raw)).trim().to_string();
        if line.is_empty() {
            return None;
        }
        let status = line
            .split_whitespace()
            .nth(1)
            .and_then(|tok| tok.parse::<u16>().ok())
            .unwrap_or(0);
        Some(Self { line, status })
    }

    /// First field without one leading `https://` or `http://`.
    pub fn host(&self) -> &str {
        let first = self.line.split_whitespace().next().unwrap_or_default();
        strip_scheme(first)
    }
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

pub fn strip_brackets(text: &str) -> String {
    text.chars().filter(|c| *c != '[' && *c != ']').collect()
}

pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Clean, stable-sort by ascending status and reduce each line to its bare host.
pub fn normalize_lines(raw: &str) -> Vec<String> {
    let mut records: Vec<ProbeRecord> = raw.lines().filter_map(ProbeRecord::parse).collect();
    records.sort_by_key(|r| r.status);
    records.iter().map(|r| r.host().to_string()).collect()
}

/// Normalize the probe report at `input` into `output`.
///
/// A missing report is treated as empty so later stages still get a (blank) target
/// list; any other read error and every write error is returned.
pub fn normalize_file(input: &Path, output: &Path) -> Result<usize> {
    let raw = match std::fs::read(input) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path=%input.display(), "probe report missing; writing empty target list");
            String::new()
        }
        Err(e) => return Err(ReconError::io(input, e)),
    };
    atomic::write_lines(output, normalize_lines(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_by_status_and_strips_decoration() {
        let raw = "https://z.example.com [404] [Tech]\nhttp://a.example.com [200]\n";
        assert_eq!(normalize_lines(raw), vec!["a.example.com", "z.example.com"]);
    }

    #[test]
    fn test_strips_ansi_colors() {
        let raw = "https://b.example.com \x1b[32m[\x1b[0m\x1b[32m301\x1b[0m\x1b[32m]\x1b[0m\n\
                   https://a.example.com \x1b[31m[500]\x1b[0m\n";
        assert_eq!(normalize_lines(raw), vec!["b.example.com", "a.example.com"]);
    }

    #[test]
    fn test_missing_status_sorts_first() {
        let raw = "https://b.example.com 200\nhttps://nostatus.example.com\nhttps://c.example.com abc\n";
        assert_eq!(
            normalize_lines(raw),
            vec!["nostatus.example.com", "c.example.com", "b.example.com"]
        );
    }

    #[test]
    fn test_clean_input_is_only_reordered() {
        let raw = "x.example.com 500\ny.example.com 200\nz.example.com 200\n";
        assert_eq!(normalize_lines(raw), vec!["y.example.com", "z.example.com", "x.example.com"]);
    }

    #[test]
    fn test_blank_and_bracket_only_lines_dropped() {
        let raw = "\n[]\n  \x1b[0m  \nhttps://a.example.com [200]\n";
        assert_eq!(normalize_lines(raw), vec!["a.example.com"]);
    }

    #[test]
    fn test_scheme_stripped_once_and_only_leading() {
        assert_eq!(strip_scheme("https://http://a.example.com"), "http://a.example.com");
        assert_eq!(strip_scheme("a.example.com/redirect?to=https://b"), "a.example.com/redirect?to=https://b");
        assert_eq!(strip_scheme("http://a.example.com:8080"), "a.example.com:8080");
    }

    #[test]
    fn test_normalize_file_missing_input_writes_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("sorted.txt");
        let n = normalize_file(&dir.path().join("httpx.txt"), &out).unwrap();
        assert_eq!(n, 0);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn test_normalize_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("httpx.txt");
        std::fs::write(&input, "https://z.example.com [404] [Tech]\nhttp://a.example.com [200]\n").unwrap();
        let out = dir.path().join("sorted.txt");
        assert_eq!(normalize_file(&input, &out).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "a.example.com\nz.example.com\n");
    }
}
