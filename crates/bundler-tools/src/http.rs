use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::error::HttpError;

/// A file to download, correlated to its task by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadObject {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArgs {
    pub download_obj: DownloadObject,
    pub url: String,
    /// Target file
    pub destination: PathBuf,
}

/// Streams HTTP response bodies to disk.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("bundler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Client { source: e })?;
        Ok(Self { client })
    }

    /// Download `args.url` into `args.destination`, chunk by chunk.
    pub async fn download(&self, args: &DownloadArgs) -> Result<(), HttpError> {
        let url = &args.url;
        tracing::debug!(%url, destination = %args.destination.display(), "downloading");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let write_err = |e| HttpError::Write {
            path: args.destination.clone(),
            source: e,
        };
        let mut file = tokio::fs::File::create(&args.destination)
            .await
            .map_err(write_err)?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| HttpError::Request {
            url: url.clone(),
            source: e,
        })? {
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        tracing::debug!(%url, bytes = written, "download finished");
        Ok(())
    }
}
