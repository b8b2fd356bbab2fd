//! Bulk rewriting of YOLO label folders.
//!
//! Every `.txt` file directly inside a folder is read in full, transformed in
//! memory and then either atomically replaced or deleted. Files are
//! independent, so they are processed in parallel and a failure on one file
//! never stops the others.

use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::io::list_label_files;
use crate::types::{
    ClassIndex, FileOutcome, FileResult, FolderReport, KeepSet, Transformed, ValueMapping,
};
use crate::utils::{create_progress_bar, write_atomic};

// Label files saved by some Windows editors start with a UTF-8 byte order mark
fn strip_bom(contents: &str) -> &str {
    contents.strip_prefix('\u{feff}').unwrap_or(contents)
}

/// Rewrite the class index of every line through `mapping`.
///
/// Blank lines stay blank and lines whose first token is not a class index are
/// kept as they are, so the line count never changes.
pub fn remap_contents(contents: &str, mapping: &ValueMapping) -> Transformed {
    let mut output = String::with_capacity(contents.len());
    let mut lines = 0;
    let mut malformed = 0;

    for line in strip_bom(contents).lines() {
        let mut tokens = line.split_whitespace();
        if let Some(first) = tokens.next() {
            match first.parse::<ClassIndex>() {
                Ok(index) => match mapping.get(index) {
                    Some(new_index) => output.push_str(&new_index.to_string()),
                    None => output.push_str(first),
                },
                Err(_) => {
                    debug!("Keeping line with non-numeric class index: {:?}", line);
                    malformed += 1;
                    output.push_str(first);
                }
            }
            for token in tokens {
                output.push(' ');
                output.push_str(token);
            }
        }
        output.push('\n');
        lines += 1;
    }

    Transformed {
        contents: output,
        lines,
        malformed,
    }
}

/// Keep only the lines whose class index is in `keep`.
///
/// Blank lines and lines without a numeric class index are dropped.
pub fn filter_contents(contents: &str, keep: &KeepSet) -> Transformed {
    let mut output = String::with_capacity(contents.len());
    let mut lines = 0;
    let mut malformed = 0;

    for line in strip_bom(contents).lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        match first.parse::<ClassIndex>() {
            Ok(index) if keep.contains(index) => {
                output.push_str(&tokens.join(" "));
                output.push('\n');
                lines += 1;
            }
            Ok(_) => {}
            Err(_) => {
                debug!("Dropping line with non-numeric class index: {:?}", line);
                malformed += 1;
            }
        }
    }

    Transformed {
        contents: output,
        lines,
        malformed,
    }
}

/// Filesystem access used by the folder processor
pub trait LabelStorage: Sync {
    fn read(&self, path: &Path) -> std::io::Result<String>;
    /// Replace the file at `path` in one step
    fn replace(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Reads and writes label files on disk, replacing them atomically
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStorage;

impl LabelStorage for DiskStorage {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path)
    }

    fn replace(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        write_atomic(path, contents)
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }
}

/// Applies remap and filter passes to a fixed set of label files
#[derive(Debug, Clone)]
pub struct LabelFolderProcessor<S: LabelStorage = DiskStorage> {
    files: Vec<PathBuf>,
    storage: S,
}

impl LabelFolderProcessor {
    /// Enumerate the label files of `dir` once
    pub fn scan(dir: &Path) -> Result<Self> {
        let files = list_label_files(dir)?;
        info!("Found {} label files in {}", files.len(), dir.display());
        Ok(Self::from_files(files))
    }

    /// Use an already enumerated list of label files
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            storage: DiskStorage,
        }
    }
}

impl<S: LabelStorage> LabelFolderProcessor<S> {
    /// Swap the storage backend, keeping the file list
    pub fn with_storage<T: LabelStorage>(self, storage: T) -> LabelFolderProcessor<T> {
        LabelFolderProcessor {
            files: self.files,
            storage,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Rewrite the leading class index of every line in every file
    pub fn remap_values(&self, mapping: &ValueMapping) -> FolderReport {
        let chained = mapping.chained_indices();
        if !chained.is_empty() {
            warn!(
                "Indices {:?} are both mapped and mapping targets; values are substituted once and not chased further",
                chained.iter().map(|i| i.0).collect::<Vec<_>>()
            );
        }
        self.run("Remap", |path| remap_file_in(&self.storage, path, mapping))
    }

    /// Keep only lines whose class index is in `keep`; delete files left empty
    pub fn filter_by_index(&self, keep: &KeepSet) -> FolderReport {
        self.run("Filter", |path| filter_file_in(&self.storage, path, keep))
    }

    fn run<F>(&self, label: &str, process: F) -> FolderReport
    where
        F: Fn(&Path) -> Result<FileResult> + Sync,
    {
        let pb = create_progress_bar(self.files.len() as u64, label);

        let results: Vec<(PathBuf, Result<FileResult>)> = self
            .files
            .par_iter()
            .map(|path| {
                let result = process(path);
                if let Err(e) = &result {
                    error!("Failed to process label file {}: {}", path.display(), e);
                }
                pb.inc(1);
                (path.clone(), result)
            })
            .collect();
        pb.finish_with_message(format!("{} complete", label));

        let mut report = FolderReport::default();
        for (path, result) in results {
            report.record(path, result);
        }
        report
    }
}

fn read_label_file<S: LabelStorage>(storage: &S, path: &Path) -> Result<String> {
    storage.read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn replace_label_file<S: LabelStorage>(
    storage: &S,
    path: &Path,
    original: &str,
    transformed: &Transformed,
) -> Result<FileOutcome> {
    if transformed.contents == original {
        return Ok(FileOutcome::Unchanged);
    }
    storage
        .replace(path, transformed.contents.as_bytes())
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(FileOutcome::Rewritten)
}

/// Remap a single label file in place
pub fn remap_file(path: &Path, mapping: &ValueMapping) -> Result<FileResult> {
    remap_file_in(&DiskStorage, path, mapping)
}

fn remap_file_in<S: LabelStorage>(
    storage: &S,
    path: &Path,
    mapping: &ValueMapping,
) -> Result<FileResult> {
    let original = read_label_file(storage, path)?;
    let transformed = remap_contents(&original, mapping);
    let outcome = replace_label_file(storage, path, &original, &transformed)?;
    Ok(FileResult {
        outcome,
        malformed: transformed.malformed,
    })
}

/// Filter a single label file in place, deleting it when no line survives
pub fn filter_file(path: &Path, keep: &KeepSet) -> Result<FileResult> {
    filter_file_in(&DiskStorage, path, keep)
}

fn filter_file_in<S: LabelStorage>(
    storage: &S,
    path: &Path,
    keep: &KeepSet,
) -> Result<FileResult> {
    let original = read_label_file(storage, path)?;
    let transformed = filter_contents(&original, keep);

    let outcome = if transformed.lines == 0 {
        storage.remove(path).map_err(|source| Error::Delete {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Deleted {} (no lines left)", path.display());
        FileOutcome::Deleted
    } else {
        replace_label_file(storage, path, &original, &transformed)?
    };

    Ok(FileResult {
        outcome,
        malformed: transformed.malformed,
    })
}
