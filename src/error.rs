use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the label, download and YAML tools.
#[derive(Debug, Error)]
pub enum Error {
    #[error("label folder does not exist or is not a directory: {0}")]
    FolderNotFound(PathBuf),

    #[error("failed to list label files in {path}: {message}")]
    Scan { path: PathBuf, message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid class index '{0}': expected a non-negative integer")]
    InvalidClassIndex(String),

    #[error("invalid value mapping: {0}")]
    InvalidMapping(String),

    #[error("failed to parse mapping file {path}: {source}")]
    MappingFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to parse URL list {path}: {source}")]
    UrlList {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("class names file not found: {0}")]
    LabelsNotFound(PathBuf),

    #[error("no class names found in {0}")]
    NoLabels(PathBuf),

    #[error("failed to serialize YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
