use crate::adapters::auth::Credentials;
use crate::config::toml_config::DownloadConfig;
use crate::domain::model::{DataGranule, DownloadOutcome};
use crate::domain::ports::Downloader;
use crate::utils::error::{ProbeError, Result};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Downloads granule data links over HTTPS, streaming each body to disk.
pub struct HttpsDownloader {
    client: Client,
    credentials: Credentials,
    concurrent_requests: usize,
}

impl HttpsDownloader {
    pub fn new(config: &DownloadConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("granule-probe/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            credentials,
            concurrent_requests: config.concurrent_requests.max(1),
        })
    }

    async fn fetch(&self, url: String, path: PathBuf) -> DownloadOutcome {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("{} already present, skipping", path.display());
            return DownloadOutcome::AlreadyPresent { url, path };
        }

        match self.stream_to_file(&url, &path).await {
            Ok(bytes) => {
                tracing::debug!("⬇️  {} ({} bytes)", path.display(), bytes);
                DownloadOutcome::Downloaded { url, path, bytes }
            }
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", url, e);
                // 不保留下載到一半的檔案
                let _ = tokio::fs::remove_file(&path).await;
                DownloadOutcome::Failed {
                    url,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn stream_to_file(&self, url: &str, path: &Path) -> Result<u64> {
        let request = self.credentials.apply(self.client.get(url));
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::DownloadError {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut bytes_stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = bytes_stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Gives every link its own file under `dir`. Repeated names get a numeric suffix
/// (`data.h5`, `data-1.h5`, ...), so no two links of a batch share a path.
fn local_paths(links: Vec<String>, dir: &Path) -> Vec<(String, Result<PathBuf>)> {
    let mut used: HashSet<String> = HashSet::new();
    links
        .into_iter()
        .map(|url| {
            let path = file_name_for(&url).map(|name| {
                let mut candidate = name.clone();
                let mut n = 1;
                while !used.insert(candidate.clone()) {
                    candidate = numbered(&name, n);
                    n += 1;
                }
                dir.join(candidate)
            });
            (url, path)
        })
        .collect()
}

fn numbered(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, n, ext),
        _ => format!("{}-{}", name, n),
    }
}

/// Last non-empty path segment of `url`.
pub fn file_name_for(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::DownloadError {
        url: url.to_string(),
        message: format!("invalid URL: {}", e),
    })?;

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .ok_or_else(|| ProbeError::DownloadError {
            url: url.to_string(),
            message: "URL has no file name".to_string(),
        })
}

#[async_trait]
impl Downloader for HttpsDownloader {
    async fn download(
        &self,
        granules: &[&DataGranule],
        local_path: &Path,
    ) -> Result<Vec<DownloadOutcome>> {
        tokio::fs::create_dir_all(local_path).await?;

        let mut seen = HashSet::new();
        let links: Vec<String> = granules
            .iter()
            .flat_map(|g| g.data_links())
            .filter(|url| seen.insert(url.to_string()))
            .map(str::to_string)
            .collect();

        tracing::info!(
            "Downloading {} file(s) for {} granule(s) into {}",
            links.len(),
            granules.len(),
            local_path.display()
        );

        let outcomes = stream::iter(local_paths(links, local_path))
            .map(|(url, path)| async move {
                match path {
                    Ok(path) => self.fetch(url, path).await,
                    Err(e) => DownloadOutcome::Failed {
                        url,
                        reason: e.to_string(),
                    },
                }
            })
            .buffered(self.concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        Ok(outcomes)
    }
}
