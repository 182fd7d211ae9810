//! Data packages shipped with server images.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::config::{BuildContext, DataSource, ResolvedProduct};
use crate::error::{BuildError, Result};
use crate::runner::join_settled;

use super::fs::copy_dir;
use super::tasks::clone_repo;

/// Directory inside the server build that receives data packages.
pub const DATA_DIR: &str = "build/source/_data";

/// Downloads data files over HTTP/HTTPS.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: Client,
}

impl DataFetcher {
    /// Create a fetcher with a 10 minute timeout per file.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(600))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("phovea-build")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Stream `url` into the file at `dest`. Returns the number of bytes written.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("download file {}", url);
        let failed = |message: String| BuildError::DownloadFailed {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(dest).await?;
        let streamed = async {
            let mut written = 0u64;
            while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<u64, BuildError>(written)
        }
        .await;

        if streamed.is_err() {
            drop(file);
            if let Err(err) = tokio::fs::remove_file(dest).await {
                warn!("could not remove partial download {}: {}", dest.display(), err);
            }
        }
        streamed
    }
}

/// Fetch one data source into `dest_dir`.
///
/// Repository sources are cloned into `workspace` unless already present and
/// their `data` directory is copied to `dest_dir/<name>`.
pub async fn fetch_data_source(
    ctx: &BuildContext,
    fetcher: &DataFetcher,
    source: &DataSource,
    dest_dir: &Path,
    workspace: &Path,
) -> Result<()> {
    match source {
        DataSource::Url { url, name } => {
            fetcher.download(url, &dest_dir.join(name)).await?;
        }
        DataSource::Repo(repo) => {
            if !workspace.join(&repo.name).exists() {
                clone_repo(ctx, workspace, repo).await?;
            }
            copy_dir(
                &workspace.join(&repo.name).join("data"),
                &dest_dir.join(&repo.name),
            )?;
        }
        DataSource::Unknown { kind } => {
            error!("unknown data type: {}", kind);
        }
    }
    Ok(())
}

/// Fetch all data sources of `product`, one after another with `--serial`.
pub async fn fetch_data(ctx: &BuildContext, product: &ResolvedProduct) -> Result<()> {
    let fetcher = DataFetcher::new()?;
    let workspace = ctx.path(&product.tmp_dir);
    let dest_dir = workspace.join(DATA_DIR);
    tokio::fs::create_dir_all(&dest_dir).await?;

    if ctx.options.serial {
        for source in &product.data {
            fetch_data_source(ctx, &fetcher, source, &dest_dir, &workspace).await?;
        }
    } else {
        join_settled(
            product
                .data
                .iter()
                .map(|source| fetch_data_source(ctx, &fetcher, source, &dest_dir, &workspace)),
        )
        .await?;
    }
    Ok(())
}
