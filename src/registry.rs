//! Profile registry parser.
//!
//! `profiles.ini` is a line-oriented INI-like file: `[Section]` headers
//! followed by `key=value` lines. Parsing is single-pass and order-preserving;
//! blank lines and lines without `=` are skipped. There is no escaping and no
//! multi-line value support, matching what the applications themselves write.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

/// One `[Name]` section with its key/value pairs, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The header name without brackets, e.g. `Profile0` or `Install4F96D1932A9F858E`.
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    /// Value for a key, if present. Later duplicates win.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    fn from_pairs(name: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Parse a registry file into its ordered sections.
///
/// Returns [`EngineError::RegistryMissing`] if the file does not exist; for
/// discovery callers that means "zero profiles", not a failure.
pub fn parse_registry(path: &Path) -> EngineResult<Vec<Section>> {
    if !path.exists() {
        return Err(EngineError::RegistryMissing(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    Ok(parse_str(&content))
}

fn parse_str(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(Section::new(line[1..line.len() - 1].to_string()));
        } else if let Some((key, value)) = line.split_once('=') {
            if let Some(section) = current.as_mut() {
                section
                    .entries
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
            // Key/value lines before any header have no section to live in
            // and are dropped, like everything else the format ignores.
        }
    }

    if let Some(done) = current {
        sections.push(done);
    }

    sections
}
