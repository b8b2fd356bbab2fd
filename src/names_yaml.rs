use log::info;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::write_atomic;

#[derive(Debug, Serialize)]
struct NamesDocument<'a> {
    names: &'a [String],
}

/// Read class names, one per line, skipping blank lines
pub fn read_class_names(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::LabelsNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(Error::NoLabels(path.to_path_buf()));
    }
    Ok(names)
}

/// Write `names` as a YAML document under the `names` key
pub fn write_names_yaml(path: &Path, names: &[String]) -> Result<()> {
    let yaml = serde_yaml::to_string(&NamesDocument { names })?;
    write_atomic(path, yaml.as_bytes()).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a class-names file into a YAML file, returning the number of names
pub fn convert_names_to_yaml(input: &Path, output: &Path) -> Result<usize> {
    let names = read_class_names(input)?;
    write_names_yaml(output, &names)?;
    info!(
        "Successfully converted {} labels to '{}'",
        names.len(),
        output.display()
    );
    Ok(names.len())
}
