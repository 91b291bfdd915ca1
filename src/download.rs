//! Model artifact acquisition over HTTP

use crate::error::{QaError, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Makes sure model artifacts exist on disk before they are loaded
#[derive(Clone)]
pub struct ModelFetcher {
    client: reqwest::Client,
}

impl ModelFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Return `destination` once it exists, downloading from `url` if it does not.
    ///
    /// Bytes are streamed into `<destination>.part` and renamed when complete, so an
    /// interrupted download never leaves a truncated file at `destination`.
    pub async fn ensure_model_present(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        if fs::try_exists(destination)
            .await
            .map_err(|e| QaError::io(format!("Cannot stat {}", destination.display()), e))?
        {
            debug!(path = %destination.display(), "Artifact already present");
            return Ok(destination.to_path_buf());
        }

        if url.is_empty() {
            return Err(QaError::Download(format!(
                "{} is missing and no download URL is configured",
                destination.display()
            )));
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| QaError::io(format!("Cannot create {}", parent.display()), e))?;
        }

        info!(url = %url, path = %destination.display(), "Downloading model artifact");
        let started = Instant::now();

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let partial = partial_path(destination);
        let mut file = fs::File::create(&partial)
            .await
            .map_err(|e| QaError::io(format!("Cannot create {}", partial.display()), e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| QaError::io(format!("Cannot write {}", partial.display()), e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| QaError::io(format!("Cannot flush {}", partial.display()), e))?;
        drop(file);

        fs::rename(&partial, destination)
            .await
            .map_err(|e| {
                QaError::io(format!("Cannot move download to {}", destination.display()), e)
            })?;

        info!(
            path = %destination.display(),
            bytes = written,
            elapsed_ms = started.elapsed().as_millis(),
            "Download complete"
        );
        Ok(destination.to_path_buf())
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
