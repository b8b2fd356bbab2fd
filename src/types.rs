use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Label file extension handled by the folder processor
pub const LABEL_EXTENSION: &str = "txt";

/// Class index at the start of an annotation line.
///
/// Tokens are compared as integers, so `"01"` and `"1"` name the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassIndex(pub u32);

impl FromStr for ClassIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidClassIndex(s.to_string()));
        }
        s.parse::<u32>()
            .map(ClassIndex)
            .map_err(|_| Error::InvalidClassIndex(s.to_string()))
    }
}

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Old index -> new index substitution table.
///
/// Lookups are single-pass: a substituted value is never looked up again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMapping {
    entries: BTreeMap<ClassIndex, ClassIndex>,
}

impl ValueMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, rejecting a key that is already mapped
    pub fn insert(&mut self, old: ClassIndex, new: ClassIndex) -> Result<()> {
        if let Some(existing) = self.entries.get(&old) {
            return Err(Error::InvalidMapping(format!(
                "index {} is mapped twice (to {} and {})",
                old, existing, new
            )));
        }
        self.entries.insert(old, new);
        Ok(())
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ClassIndex, ClassIndex)>,
    {
        let mut mapping = Self::new();
        for (old, new) in pairs {
            mapping.insert(old, new)?;
        }
        Ok(mapping)
    }

    /// Merge another mapping into this one; keys must stay unique
    pub fn extend(&mut self, other: ValueMapping) -> Result<()> {
        for (old, new) in other.entries {
            self.insert(old, new)?;
        }
        Ok(())
    }

    pub fn get(&self, index: ClassIndex) -> Option<ClassIndex> {
        self.entries.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices that are both a target and a key. Applying such a mapping a
    /// second time is not a no-op.
    pub fn chained_indices(&self) -> Vec<ClassIndex> {
        self.entries
            .iter()
            .filter(|(old, new)| old != new && self.entries.contains_key(new))
            .map(|(_, new)| *new)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Whitelist of class indices that survive a filter pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepSet {
    indices: BTreeSet<ClassIndex>,
}

impl KeepSet {
    pub fn contains(&self, index: ClassIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl FromIterator<ClassIndex> for KeepSet {
    fn from_iter<T: IntoIterator<Item = ClassIndex>>(iter: T) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

/// Result of running a line transform over one file's contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub contents: String,
    /// Lines written back
    pub lines: usize,
    /// Lines whose first token is not a class index
    pub malformed: usize,
}

/// What happened to a single label file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Rewritten,
    Unchanged,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileResult {
    pub outcome: FileOutcome,
    pub malformed: usize,
}

/// Aggregate result of a folder pass
#[derive(Debug, Default)]
pub struct FolderReport {
    pub rewritten: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
    pub malformed_lines: usize,
}

impl FolderReport {
    pub fn total_files(&self) -> usize {
        self.rewritten.len() + self.unchanged.len() + self.deleted.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn record(&mut self, path: PathBuf, result: Result<FileResult>) {
        match result {
            Ok(FileResult { outcome, malformed }) => {
                self.malformed_lines += malformed;
                match outcome {
                    FileOutcome::Rewritten => self.rewritten.push(path),
                    FileOutcome::Unchanged => self.unchanged.push(path),
                    FileOutcome::Deleted => self.deleted.push(path),
                }
            }
            Err(e) => self.failed.push((path, e)),
        }
    }

    pub fn print_summary(&self) {
        log::info!("=== Label Folder Summary ===");
        log::info!("Total label files: {}", self.total_files());
        log::info!("Rewritten: {}", self.rewritten.len());
        log::info!("Unchanged: {}", self.unchanged.len());
        log::info!("Deleted (no lines left): {}", self.deleted.len());
        if self.malformed_lines > 0 {
            log::info!("Malformed lines skipped: {}", self.malformed_lines);
        }
        if self.has_failures() {
            log::warn!("Failed: {}", self.failed.len());
            for (path, e) in &self.failed {
                log::warn!("  {}: {}", path.display(), e);
            }
        }
    }
}

/// Aggregate result of a download batch
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(usize, Error)>,
}

impl DownloadReport {
    pub fn print_summary(&self) {
        log::info!("=== Download Summary ===");
        log::info!("Images saved: {}", self.saved.len());
        if !self.failed.is_empty() {
            log::warn!("Failed downloads: {}", self.failed.len());
        }
    }
}
