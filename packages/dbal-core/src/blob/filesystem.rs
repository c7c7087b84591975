//! Local filesystem blob backend
//!
//! Keys map onto paths relative to a canonicalized root; any key containing
//! a `..` segment or resolving outside the root is rejected before any I/O.
//! Writes go through a `.tmp`-then-rename so a reader never observes a
//! partially written file. Custom metadata has no filesystem attribute to
//! live in, so it is persisted as a sidecar `<key>.meta.json` file next to
//! the object.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::{BlobListResult, BlobMetadata, BlobStorage, DownloadOptions, ListOptions, UploadOptions, BLOB_RESOURCE};
use crate::error::{DbalError, Result};
use crate::tenant::{Action, TenantContext};

pub struct FilesystemBackend {
    root: PathBuf,
}

const CONTENT_TYPE_TABLE: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("csv", "text/csv"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

fn guess_content_type(key: &str) -> String {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    ext.and_then(|ext| CONTENT_TYPE_TABLE.iter().find(|(e, _)| *e == ext).map(|(_, ct)| ct.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn meta_sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".meta.json");
    path.with_file_name(name)
}

fn is_meta_sidecar(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
        && path.file_stem().and_then(|s| Path::new(s).extension()).and_then(|e| e.to_str()) == Some("meta")
}

fn read_custom_metadata(path: &Path) -> HashMap<String, String> {
    std::fs::read_to_string(meta_sidecar_path(path))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn write_custom_metadata(path: &Path, metadata: &HashMap<String, String>) -> Result<()> {
    if metadata.is_empty() {
        let _ = std::fs::remove_file(meta_sidecar_path(path));
        return Ok(());
    }
    let text = serde_json::to_string(metadata)
        .map_err(|e| DbalError::internal(format!("serializing blob metadata: {e}")))?;
    std::fs::write(meta_sidecar_path(path), text)
        .map_err(|e| DbalError::internal(format!("writing blob metadata sidecar: {e}")))
}

impl FilesystemBackend {
    pub fn new(root: &str) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|e| DbalError::internal(format!("creating blob root '{root}': {e}")))?;
        let root = std::fs::canonicalize(root)
            .map_err(|e| DbalError::internal(format!("canonicalizing blob root '{root}': {e}")))?;
        Ok(Self { root })
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(DbalError::validation(format!("invalid blob key '{key}'")));
        }
        Ok(self.root.join(key))
    }

    fn metadata_for(&self, key: &str, path: &Path) -> Result<BlobMetadata> {
        let meta = std::fs::metadata(path)
            .map_err(|e| DbalError::not_found(format!("blob '{key}': {e}")))?;
        let data = std::fs::read(path)
            .map_err(|e| DbalError::internal(format!("reading blob '{key}': {e}")))?;
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(BlobMetadata {
            key: key.to_string(),
            size: meta.len(),
            etag: hex::encode(Sha256::digest(&data)),
            content_type: guess_content_type(key),
            last_modified: modified,
            custom_metadata: read_custom_metadata(path),
        })
    }

    /// Remove empty parent directories up to (but not including) the root,
    /// so deleting the last object under a prefix doesn't leave an empty
    /// directory tree behind.
    fn prune_empty_parents(&self, path: &Path) {
        let mut dir = path.parent().map(Path::to_path_buf);
        while let Some(current) = dir {
            if current == self.root {
                break;
            }
            match std::fs::read_dir(&current) {
                Ok(mut entries) => {
                    if entries.next().is_none() {
                        let _ = std::fs::remove_dir(&current);
                        dir = current.parent().map(Path::to_path_buf);
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }
}

#[async_trait]
impl BlobStorage for FilesystemBackend {
    async fn upload(
        &self,
        ctx: &mut TenantContext,
        key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<BlobMetadata> {
        ctx.authorize(Action::Write, BLOB_RESOURCE)?;
        let size = data.len() as u64;
        ctx.quota.check_blob_upload(size)?;

        let path = self.key_to_path(key)?;
        if !options.overwrite && path.is_file() {
            return Err(DbalError::conflict(format!("blob '{key}' already exists")));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbalError::internal(format!("creating parent dirs for '{key}': {e}")))?;
        }

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &data)
            .map_err(|e| DbalError::internal(format!("writing blob '{key}': {e}")))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| DbalError::internal(format!("finalizing blob '{key}': {e}")))?;
        write_custom_metadata(&path, &options.metadata)?;

        let mut metadata = self.metadata_for(key, &path)?;
        if let Some(content_type) = &options.content_type {
            metadata.content_type = content_type.clone();
        }
        ctx.quota.record_blob_uploaded(size);
        Ok(metadata)
    }

    async fn download(&self, ctx: &TenantContext, key: &str, options: &DownloadOptions) -> Result<Vec<u8>> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let path = self.key_to_path(key)?;
        let data = std::fs::read(&path).map_err(|_| DbalError::not_found(format!("blob '{key}'")))?;
        match options.range {
            Some((start, end)) => {
                let start = start as usize;
                if start >= data.len() {
                    return Err(DbalError::validation(format!(
                        "range start {start} is beyond blob '{key}' size {}",
                        data.len()
                    )));
                }
                let end = (end as usize + 1).min(data.len());
                Ok(data[start..end].to_vec())
            }
            None => Ok(data),
        }
    }

    async fn delete(&self, ctx: &mut TenantContext, key: &str) -> Result<()> {
        ctx.authorize(Action::Delete, BLOB_RESOURCE)?;
        let path = self.key_to_path(key)?;
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        std::fs::remove_file(&path).map_err(|_| DbalError::not_found(format!("blob '{key}'")))?;
        let _ = std::fs::remove_file(meta_sidecar_path(&path));
        self.prune_empty_parents(&path);
        ctx.quota.record_blob_deleted(size);
        Ok(())
    }

    async fn exists(&self, ctx: &TenantContext, key: &str) -> Result<bool> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let path = self.key_to_path(key)?;
        Ok(path.is_file())
    }

    async fn get_metadata(&self, ctx: &TenantContext, key: &str) -> Result<BlobMetadata> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let path = self.key_to_path(key)?;
        self.metadata_for(key, &path)
    }

    async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<BlobListResult> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let prefix = options.prefix.clone().unwrap_or_default();
        let mut keys = Vec::new();
        walk(&self.root, &self.root, &mut keys)
            .map_err(|e| DbalError::internal(format!("listing blobs: {e}")))?;
        keys.retain(|k| k.starts_with(&prefix));
        if let Some(token) = &options.continuation_token {
            keys.retain(|k| k.as_str() > token.as_str());
        }
        keys.sort();

        let max = options.max_keys.unwrap_or(1000) as usize;
        let is_truncated = keys.len() > max;
        let mut items = Vec::new();
        for key in keys.into_iter().take(max) {
            let path = self.root.join(&key);
            items.push(self.metadata_for(&key, &path)?);
        }

        let next_continuation_token = is_truncated.then(|| items.last().map(|m| m.key.clone())).flatten();
        Ok(BlobListResult { items, next_continuation_token, is_truncated })
    }

    async fn generate_presigned_url(&self, ctx: &TenantContext, _key: &str, _expires_in_secs: u64) -> Result<String> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        Ok(String::new())
    }

    async fn total_size(&self, ctx: &TenantContext) -> Result<u64> {
        let result = self.list(ctx, &ListOptions::default()).await?;
        Ok(result.items.iter().map(|m| m.size).sum())
    }

    async fn object_count(&self, ctx: &TenantContext) -> Result<u64> {
        let result = self.list(ctx, &ListOptions::default()).await?;
        Ok(result.items.len() as u64)
    }
}

fn walk(root: &Path, dir: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, keys)?;
        } else if path.extension().and_then(|e| e.to_str()) != Some("tmp") && !is_meta_sidecar(&path) {
            if let Ok(rel) = path.strip_prefix(root) {
                keys.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantContext;
    use tempfile::tempdir;

    fn ctx() -> TenantContext {
        TenantContext::unrestricted("tenant-1", "user-1")
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        backend.upload(&mut ctx(), "a/b.txt", b"hi".to_vec(), &UploadOptions::default()).await.unwrap();
        let data = backend.download(&ctx(), "a/b.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(data, b"hi");
    }

    #[tokio::test]
    async fn path_traversal_key_is_rejected() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        let err = backend
            .upload(&mut ctx(), "../escape.txt", b"x".to_vec(), &UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn delete_prunes_empty_parent_directories() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        backend.upload(&mut ctx(), "a/b/c.txt", b"x".to_vec(), &UploadOptions::default()).await.unwrap();
        backend.delete(&mut ctx(), "a/b/c.txt").await.unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn presigned_url_is_empty_string() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        let url = backend.generate_presigned_url(&ctx(), "k", 60).await.unwrap();
        assert_eq!(url, "");
    }

    #[tokio::test]
    async fn download_range_starting_past_end_is_rejected() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        backend.upload(&mut ctx(), "a.txt", b"hello".to_vec(), &UploadOptions::default()).await.unwrap();
        let err = backend
            .download(&ctx(), "a.txt", &DownloadOptions { range: Some((10, 20)) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn custom_metadata_round_trips_through_sidecar() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("author".to_string(), "jane".to_string());
        backend
            .upload(&mut ctx(), "a.txt", b"x".to_vec(), &UploadOptions { metadata: metadata.clone(), ..Default::default() })
            .await
            .unwrap();
        let meta = backend.get_metadata(&ctx(), "a.txt").await.unwrap();
        assert_eq!(meta.custom_metadata, metadata);
    }

    #[tokio::test]
    async fn list_resumes_after_continuation_token() {
        let dir = tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
        for key in ["a", "b", "c"] {
            backend.upload(&mut ctx(), key, vec![1], &UploadOptions::default()).await.unwrap();
        }
        let result = backend
            .list(&ctx(), &ListOptions { continuation_token: Some("a".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(result.items.iter().map(|m| m.key.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
