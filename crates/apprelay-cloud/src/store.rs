//! Narrow client for the artifact object store

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use apprelay_core::prelude::*;

use crate::service::{decode_error, parse_base_url, transport_error};

const STORE_NAME: &str = "object-store";

/// Artifact object store: the single download call the install reaction
/// needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch `bucket/key` into `dest`, overwriting any existing file
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;
}

/// REST-backed [`ObjectStore`] client
pub struct HttpObjectStore {
    client: Client,
    base_url: Url,
}

impl HttpObjectStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{bucket}/{key}"))
            .map_err(|e| Error::config(format!("invalid object path {bucket}/{key}: {e}")))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let url = self.object_url(bucket, key)?;
        debug!("Downloading {url} -> {}", dest.display());

        let response = self.client.get(url).send().await.map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => {
                let bytes = response.bytes().await.map_err(decode_error)?;
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(dest, &bytes).await?;
                info!("Fetched {bucket}/{key} ({} bytes)", bytes.len());
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(Error::not_found(format!("object {bucket}/{key}"))),
            s if s.is_server_error() => Err(Error::service_unavailable(
                STORE_NAME,
                format!("{bucket}/{key}: HTTP {s}"),
            )),
            s => Err(Error::protocol(format!("{bucket}/{key}: HTTP {s}"))),
        }
    }
}
