//! Sequential image downloader.
//!
//! URL `i` (1-based) is saved as `{prefix}_{i}{ext}`. A failed request is
//! logged and recorded; the rest of the batch carries on.

use log::{error, info};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DownloadReport;
use crate::utils::{create_progress_bar, ensure_directory, infer_image_format, write_atomic};

/// Source of image bytes for a URL
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Download {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let to_error = |e: reqwest::Error| Error::Download {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(to_error)?;
        let bytes = response.bytes().map_err(to_error)?;
        Ok(bytes.to_vec())
    }
}

pub struct ImageDownloader<F: Fetcher> {
    urls: Vec<String>,
    output_dir: PathBuf,
    prefix: String,
    fetcher: F,
}

impl<F: Fetcher> ImageDownloader<F> {
    pub fn new(urls: Vec<String>, output_dir: &Path, prefix: &str, fetcher: F) -> Self {
        Self {
            urls,
            output_dir: output_dir.to_path_buf(),
            prefix: sanitize_filename::sanitize(prefix),
            fetcher,
        }
    }

    /// Download every URL into the output folder
    pub fn download_all(&self) -> Result<DownloadReport> {
        ensure_directory(&self.output_dir).map_err(|source| Error::Write {
            path: self.output_dir.clone(),
            source,
        })?;

        info!("Downloading {} images, please wait...", self.urls.len());
        let pb = create_progress_bar(self.urls.len() as u64, "Download");
        let mut report = DownloadReport::default();

        for (i, url) in self.urls.iter().enumerate() {
            let number = i + 1;
            match self.download_one(number, url) {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    error!("Error downloading image {}: {}", number, e);
                    report.failed.push((number, e));
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("Download complete");

        info!("Images saved in directory: {}", self.output_dir.display());
        Ok(report)
    }

    fn download_one(&self, number: usize, url: &str) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch(url)?;
        let extension = url_extension(url)
            .or_else(|| infer_image_format(&bytes).map(|ext| format!(".{}", ext)))
            .unwrap_or_default();

        let path = self
            .output_dir
            .join(format!("{}_{}{}", self.prefix, number, extension));
        write_atomic(&path, &bytes).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Lower-cased extension (with the dot) of the URL's path, ignoring any query
fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?.to_string();
    let extension = Path::new(&name).extension()?.to_str()?;
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", extension.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    struct FakeFetcher {
        responses: HashMap<String, Vec<u8>>,
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Download {
                    url: url.to_string(),
                    message: "404 Not Found".to_string(),
                })
        }
    }

    #[test]
    fn url_extension_uses_path_only() {
        assert_eq!(
            url_extension("https://cdn.example/img/Photo.JPG?w=200#x"),
            Some(".jpg".to_string())
        );
        assert_eq!(url_extension("https://cdn.example/img/photo"), None);
        assert_eq!(url_extension("not a url"), None);
    }

    #[test]
    fn download_all_names_files_by_position_and_tolerates_failures() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out");
        let png = vec![0x89, b'P', b'N', b'G', 0, 0];

        let fetcher = FakeFetcher {
            responses: HashMap::from([
                ("https://a.example/one.jpg".to_string(), b"jpeg".to_vec()),
                ("https://a.example/three".to_string(), png.clone()),
            ]),
        };
        let urls = vec![
            "https://a.example/one.jpg".to_string(),
            "https://a.example/missing.jpg".to_string(),
            "https://a.example/three".to_string(),
        ];

        let downloader = ImageDownloader::new(urls, &output, "wash", fetcher);
        let report = downloader.download_all().unwrap();

        assert_eq!(
            report.saved,
            vec![output.join("wash_1.jpg"), output.join("wash_3.png")]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert_eq!(fs::read(output.join("wash_1.jpg")).unwrap(), b"jpeg");
        assert_eq!(fs::read(output.join("wash_3.png")).unwrap(), png);
        assert!(!output.join("wash_2.jpg").exists());
    }

    #[test]
    fn download_all_sanitizes_prefix() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher {
            responses: HashMap::from([("https://a.example/x.gif".to_string(), vec![1])]),
        };

        let downloader = ImageDownloader::new(
            vec!["https://a.example/x.gif".to_string()],
            temp.path(),
            "a/b",
            fetcher,
        );
        let report = downloader.download_all().unwrap();

        assert_eq!(report.saved, vec![temp.path().join("ab_1.gif")]);
    }
}
