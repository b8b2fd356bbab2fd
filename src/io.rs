use calamine::{open_workbook_auto, Reader};
use glob::{glob, Pattern};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::LABEL_EXTENSION;

/// List the label files directly inside `dir` (non-recursive), sorted by path
pub fn list_label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FolderNotFound(dir.to_path_buf()));
    }

    // Escape the folder so brackets or asterisks in its name match literally
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        LABEL_EXTENSION
    );
    let entries = glob(&pattern).map_err(|e| Error::Scan {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::Scan {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read the list of image URLs to download.
///
/// Spreadsheets (`.xlsx`, `.xls`, `.xlsm`, `.ods`) and `.csv` files contribute
/// the first column of every row below the header row. Anything else is read
/// as one URL per line. Blank entries are dropped.
pub fn read_urls(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xls") | Some("xlsm") | Some("ods") => read_urls_from_workbook(path),
        Some("csv") => read_urls_from_csv(path),
        _ => {
            let content = fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }
    }
}

fn read_urls_from_workbook(path: &Path) -> Result<Vec<String>> {
    let to_error = |source: calamine::Error| Error::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(to_error)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range.map_err(to_error)?;

    Ok(range
        .rows()
        .skip(1)
        .filter_map(|row| row.first())
        .map(|cell| cell.to_string().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect())
}

fn read_urls_from_csv(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::UrlList {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(url) = record.get(0).map(str::trim).filter(|url| !url.is_empty()) {
            urls.push(url.to_string());
        }
    }
    Ok(urls)
}
