//! Content-addressed blob storage
//!
//! [`BlobStorage`] is implemented by three interchangeable backends: an
//! in-memory map for tests, a local filesystem store, and an S3-compatible
//! HTTP backend. All three share the same metadata and listing shapes so a
//! caller can swap backends without touching call sites.

pub mod filesystem;
pub mod memory;
pub mod s3;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::tenant::TenantContext;

#[derive(Debug, Clone)]
pub struct BlobMetadata {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
    /// User-supplied key/value pairs carried alongside the object (S3's
    /// `x-amz-meta-*` headers; stored verbatim by the other two backends).
    pub custom_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Whether an upload may replace an existing object at the same key.
    /// Defaults to `true`, so a plain `UploadOptions::default()` never
    /// implicitly blocks a write.
    pub overwrite: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self { content_type: None, metadata: HashMap::new(), overwrite: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub range: Option<(u64, u64)>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub max_keys: Option<u32>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlobListResult {
    pub items: Vec<BlobMetadata>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

/// The resource name blob operations authorize against. Blobs are not
/// schema-typed like structured records, so there is only the one resource
/// for permission-string purposes (`read:blob`, `write:blob`, ...).
pub const BLOB_RESOURCE: &str = "blob";

/// A content-addressed blob store. Every method is keyed by an opaque
/// string key the caller owns; backends never interpret key structure
/// beyond what is needed for their own storage layout (e.g. the
/// filesystem backend maps a key to a relative path). Every operation
/// authorizes against `ctx` before touching storage; mutating operations
/// also admit against `ctx`'s quota and record the resulting usage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(
        &self,
        ctx: &mut TenantContext,
        key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<BlobMetadata>;

    async fn upload_stream(
        &self,
        ctx: &mut TenantContext,
        key: &str,
        chunks: Vec<Vec<u8>>,
        options: &UploadOptions,
    ) -> Result<BlobMetadata> {
        let data = chunks.into_iter().flatten().collect();
        self.upload(ctx, key, data, options).await
    }

    async fn download(&self, ctx: &TenantContext, key: &str, options: &DownloadOptions) -> Result<Vec<u8>>;

    async fn download_stream(
        &self,
        ctx: &TenantContext,
        key: &str,
        options: &DownloadOptions,
    ) -> Result<Vec<Vec<u8>>> {
        Ok(vec![self.download(ctx, key, options).await?])
    }

    async fn delete(&self, ctx: &mut TenantContext, key: &str) -> Result<()>;

    async fn exists(&self, ctx: &TenantContext, key: &str) -> Result<bool>;

    async fn get_metadata(&self, ctx: &TenantContext, key: &str) -> Result<BlobMetadata>;

    async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<BlobListResult>;

    async fn copy(&self, ctx: &mut TenantContext, source_key: &str, dest_key: &str) -> Result<BlobMetadata> {
        let data = self.download(ctx, source_key, &DownloadOptions::default()).await?;
        let metadata = self.get_metadata(ctx, source_key).await?;
        self.upload(
            ctx,
            dest_key,
            data,
            &UploadOptions { content_type: Some(metadata.content_type), ..Default::default() },
        )
        .await
    }

    /// A time-limited, unsigned-query URL for direct client access. Not
    /// every backend supports this; the filesystem backend returns an
    /// empty string since it has no externally-reachable endpoint.
    async fn generate_presigned_url(&self, ctx: &TenantContext, key: &str, expires_in_secs: u64) -> Result<String>;

    async fn total_size(&self, ctx: &TenantContext) -> Result<u64>;

    async fn object_count(&self, ctx: &TenantContext) -> Result<u64>;
}
