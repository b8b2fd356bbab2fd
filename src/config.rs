use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{ClassIndex, KeepSet, ValueMapping};

/// Batch tools for preparing YOLO datasets.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rewrite the class index at the start of every label line
    Remap {
        /// Directory containing YOLO label .txt files
        #[arg(short = 'd', long = "label_dir")]
        label_dir: PathBuf,

        /// Index substitutions as OLD=NEW pairs, e.g. 0=1,1=2
        #[arg(long = "map", value_delimiter = ',', value_parser = parse_mapping_pair)]
        map: Vec<(ClassIndex, ClassIndex)>,

        /// JSON object of OLD -> NEW indices, e.g. {"0": "1", "1": 2}
        #[arg(long = "mapping_file")]
        mapping_file: Option<PathBuf>,
    },

    /// Keep only label lines whose class index is listed; delete emptied files
    Filter {
        /// Directory containing YOLO label .txt files
        #[arg(short = 'd', long = "label_dir")]
        label_dir: PathBuf,

        /// Class indices to keep, e.g. 0,1,2
        #[arg(long = "keep", value_delimiter = ',', required = true, value_parser = parse_class_index)]
        keep: Vec<ClassIndex>,
    },

    /// Download every image listed in a text or CSV file
    Download {
        /// Text file with one URL per line, or CSV with URLs in the first column
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Directory where the images are saved
        #[arg(short = 'o', long = "output_dir")]
        output_dir: PathBuf,

        /// File name prefix; images are saved as PREFIX_N.ext
        #[arg(long = "prefix")]
        prefix: String,

        /// Per-request timeout in seconds
        #[arg(long = "timeout_secs", default_value_t = 30, value_parser = validate_timeout)]
        timeout_secs: u64,
    },

    /// Convert a list of class names into a YAML file under the `names` key
    NamesToYaml {
        /// Text file with one class name per line
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// YAML file to write
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

// Validate a single class index
fn parse_class_index(s: &str) -> std::result::Result<ClassIndex, String> {
    ClassIndex::from_str(s.trim()).map_err(|e| e.to_string())
}

// Validate an OLD=NEW (or OLD:NEW) pair
fn parse_mapping_pair(s: &str) -> std::result::Result<(ClassIndex, ClassIndex), String> {
    let (old, new) = s
        .split_once('=')
        .or_else(|| s.split_once(':'))
        .ok_or_else(|| format!("expected OLD=NEW, got '{}'", s))?;
    Ok((parse_class_index(old)?, parse_class_index(new)?))
}

// Validate that the timeout is positive
fn validate_timeout(s: &str) -> std::result::Result<u64, String> {
    match u64::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("TIMEOUT must be a positive number of seconds".to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexValue {
    Number(u32),
    Text(String),
}

impl IndexValue {
    fn to_class_index(&self) -> Result<ClassIndex> {
        match self {
            IndexValue::Number(n) => Ok(ClassIndex(*n)),
            IndexValue::Text(s) => s.trim().parse(),
        }
    }
}

/// Load a value mapping from a JSON object such as `{"0": "1", "1": 2}`
pub fn load_mapping_file(path: &Path) -> Result<ValueMapping> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: BTreeMap<String, IndexValue> =
        serde_json::from_str(&content).map_err(|source| Error::MappingFile {
            path: path.to_path_buf(),
            source,
        })?;

    let mut mapping = ValueMapping::new();
    for (old, new) in raw {
        mapping.insert(old.trim().parse()?, new.to_class_index()?)?;
    }
    Ok(mapping)
}

/// Combine `--map` pairs and an optional mapping file into one mapping
pub fn build_value_mapping(
    pairs: &[(ClassIndex, ClassIndex)],
    mapping_file: Option<&Path>,
) -> Result<ValueMapping> {
    let mut mapping = ValueMapping::from_pairs(pairs.iter().copied())?;
    if let Some(path) = mapping_file {
        mapping.extend(load_mapping_file(path)?)?;
    }
    if mapping.is_empty() {
        return Err(Error::InvalidMapping(
            "no substitutions given; use --map or --mapping_file".to_string(),
        ));
    }
    Ok(mapping)
}

pub fn build_keep_set(indices: &[ClassIndex]) -> KeepSet {
    indices.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_pair() {
        assert_eq!(
            parse_mapping_pair("0=1"),
            Ok((ClassIndex(0), ClassIndex(1)))
        );
        assert_eq!(
            parse_mapping_pair("12:3"),
            Ok((ClassIndex(12), ClassIndex(3)))
        );
        assert!(parse_mapping_pair("0").is_err());
        assert!(parse_mapping_pair("a=1").is_err());
        assert!(parse_mapping_pair("1=-2").is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout("10").is_ok());
        assert!(validate_timeout("0").is_err());
        assert!(validate_timeout("abc").is_err());
    }

    #[test]
    fn test_cli_parses_remap_and_filter() {
        let args = Args::try_parse_from([
            "yolo-label-tools",
            "remap",
            "-d",
            "labels",
            "--map",
            "0=1,1=2",
        ])
        .unwrap();
        match args.command {
            Command::Remap { label_dir, map, .. } => {
                assert_eq!(label_dir, PathBuf::from("labels"));
                assert_eq!(
                    map,
                    vec![
                        (ClassIndex(0), ClassIndex(1)),
                        (ClassIndex(1), ClassIndex(2))
                    ]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from([
            "yolo-label-tools",
            "filter",
            "--label_dir",
            "labels",
            "--keep",
            "0,3",
        ])
        .unwrap();
        match args.command {
            Command::Filter { keep, .. } => {
                assert_eq!(keep, vec![ClassIndex(0), ClassIndex(3)]);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Args::try_parse_from(["yolo-label-tools", "filter", "-d", "labels"]).is_err());
    }

    #[test]
    fn test_build_value_mapping_rejects_duplicates_and_empty() {
        let pairs = vec![
            (ClassIndex(0), ClassIndex(1)),
            (ClassIndex(0), ClassIndex(2)),
        ];
        assert!(matches!(
            build_value_mapping(&pairs, None),
            Err(Error::InvalidMapping(_))
        ));
        assert!(matches!(
            build_value_mapping(&[], None),
            Err(Error::InvalidMapping(_))
        ));
    }

    #[test]
    fn test_load_mapping_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("mapping.json");
        fs::write(&path, r#"{"0": "1", "1": 2, "03": "4"}"#).unwrap();

        let mapping = build_value_mapping(&[(ClassIndex(7), ClassIndex(8))], Some(&path)).unwrap();

        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping.get(ClassIndex(0)), Some(ClassIndex(1)));
        assert_eq!(mapping.get(ClassIndex(1)), Some(ClassIndex(2)));
        assert_eq!(mapping.get(ClassIndex(3)), Some(ClassIndex(4)));
        assert_eq!(mapping.get(ClassIndex(7)), Some(ClassIndex(8)));
    }

    #[test]
    fn test_load_mapping_file_rejects_bad_json_and_keys() {
        let temp = tempfile::tempdir().unwrap();
        let bad_json = temp.path().join("bad.json");
        fs::write(&bad_json, "{not json").unwrap();
        assert!(matches!(
            load_mapping_file(&bad_json),
            Err(Error::MappingFile { .. })
        ));

        let bad_key = temp.path().join("bad_key.json");
        fs::write(&bad_key, r#"{"car": "1"}"#).unwrap();
        assert!(matches!(
            load_mapping_file(&bad_key),
            Err(Error::InvalidClassIndex(_))
        ));
    }
}
