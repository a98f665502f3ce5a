//! Property sets written out as generated configuration files.

use std::collections::BTreeMap;
use std::io::{self, Write};

/// Name/value pairs for a generated configuration artifact.
///
/// Keys are unique and the last `set` wins. Entries serialize in
/// lexicographic key order so generated files are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: BTreeMap<String, String>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// One `name=value` line per entry. Nothing is escaped.
    pub fn serialize(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Write every serialized line, newline-terminated.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in self.serialize() {
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertySet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.set(name, value);
        }
        set
    }
}
