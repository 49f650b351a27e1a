//! Asset sources: places a named template image can be fetched from.
//!
//! The template resolver probes an ordered list of `Arc<dyn AssetSource>`; a
//! new storage backend only needs to implement `fetch`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// A place a named asset may live.
///
/// `Ok(None)` means the asset is not here. `Err` is reserved for a source that
/// could not answer (permissions, network); callers treat both as a miss.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Option<Bytes>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// Local directory
// ────────────────────────────────────────────────────────────────────────────

pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn fetch(&self, name: &str) -> Result<Option<Bytes>> {
        let path = self.root.join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO bucket
// ────────────────────────────────────────────────────────────────────────────

pub struct S3AssetSource {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3AssetSource {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }
}

#[async_trait]
impl AssetSource for S3AssetSource {
    async fn fetch(&self, name: &str) -> Result<Option<Bytes>> {
        let key = format!("{}{}", self.prefix, name);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(anyhow::anyhow!("S3 get_object {key} failed: {e}"));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| anyhow::anyhow!("S3 body read for {key} failed: {e}"))?;
        Ok(Some(body.into_bytes()))
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory bundle
// ────────────────────────────────────────────────────────────────────────────

/// Assets held in memory, e.g. compiled into the binary or preloaded at startup.
#[derive(Default)]
pub struct EmbeddedAssetSource {
    assets: HashMap<String, Bytes>,
}

impl EmbeddedAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.assets.insert(name.into(), data.into());
        self
    }
}

#[async_trait]
impl AssetSource for EmbeddedAssetSource {
    async fn fetch(&self, name: &str) -> Result<Option<Bytes>> {
        Ok(self.assets.get(name).cloned())
    }

    fn describe(&self) -> String {
        format!("embedded ({} assets)", self.assets.len())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
