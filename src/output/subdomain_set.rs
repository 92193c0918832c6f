use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::output::atomic;

/// Deduplicated hostnames, always iterated in ascending order.
///
/// Entries are trimmed on insert; blank entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubdomainSet {
    names: BTreeSet<String>,
}

impl SubdomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for blank or already present names.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.names.insert(name.to_string())
    }

    /// Insert every line of `text`.
    pub fn extend_lines(&mut self, text: &str) -> usize {
        text.lines().filter(|l| self.insert(l)).count()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Persist sorted, one name per line.
    pub fn write_to(&self, path: &Path) -> Result<usize> {
        atomic::write_lines(path, self.iter())
    }
}

impl<'a> FromIterator<&'a str> for SubdomainSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut set = SubdomainSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_trims_and_dedups() {
        let mut set = SubdomainSet::new();
        assert!(set.insert(" b.example.com "));
        assert!(set.insert("a.example.com"));
        assert!(!set.insert("b.example.com"));
        assert!(!set.insert("   "));
        assert!(!set.insert(""));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_extend_lines_handles_crlf() {
        let mut set = SubdomainSet::new();
        let added = set.extend_lines("x.example.com\r\n\r\ny.example.com\r\nx.example.com\n");
        assert_eq!(added, 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_write_to_is_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("s.txt");
        let set: SubdomainSet = ["c.example.com", "a.example.com", "b.example.com"].into_iter().collect();
        set.write_to(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "a.example.com\nb.example.com\nc.example.com\n"
        );
    }
}
