//! YOLO dataset preparation tools
//!
//! This library rewrites or filters class indices in folders of YOLO label
//! files, downloads listed images in bulk, and exports class-name lists to the
//! YAML `names` layout used by dataset configs.

pub mod config;
pub mod download;
pub mod error;
pub mod io;
pub mod label_processing;
pub mod names_yaml;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{Args, Command};
pub use download::{Fetcher, HttpFetcher, ImageDownloader};
pub use error::{Error, Result};
pub use io::{list_label_files, read_urls};
pub use label_processing::{
    filter_contents, remap_contents, DiskStorage, LabelFolderProcessor, LabelStorage,
};
pub use names_yaml::convert_names_to_yaml;
pub use types::{ClassIndex, FileOutcome, FolderReport, KeepSet, ValueMapping};
