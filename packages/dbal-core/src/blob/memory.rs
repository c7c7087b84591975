//! In-memory blob backend, used in tests and single-process deployments

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use super::{BlobListResult, BlobMetadata, BlobStorage, DownloadOptions, ListOptions, UploadOptions, BLOB_RESOURCE};
use crate::error::{DbalError, Result};
use crate::tenant::{Action, TenantContext};

struct Entry {
    data: Vec<u8>,
    content_type: String,
    custom_metadata: HashMap<String, String>,
    last_modified: chrono::DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn etag_of(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[async_trait]
impl BlobStorage for MemoryBackend {
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

        let etag = etag_of(&data);
        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let last_modified = Utc::now();

        let mut guard = self.entries.lock().expect("memory blob store poisoned");
        if !options.overwrite && guard.contains_key(key) {
            return Err(DbalError::conflict(format!("blob '{key}' already exists")));
        }
        guard.insert(
            key.to_string(),
            Entry {
                data,
                content_type: content_type.clone(),
                custom_metadata: options.metadata.clone(),
                last_modified,
            },
        );
        drop(guard);

        ctx.quota.record_blob_uploaded(size);
        Ok(BlobMetadata {
            key: key.to_string(),
            size,
            etag,
            content_type,
            last_modified,
            custom_metadata: options.metadata.clone(),
        })
    }

    async fn download(&self, ctx: &TenantContext, key: &str, options: &DownloadOptions) -> Result<Vec<u8>> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        let entry = guard
            .get(key)
            .ok_or_else(|| DbalError::not_found(format!("blob '{key}'")))?;
        match options.range {
            Some((start, end)) => {
                let start = start as usize;
                if start >= entry.data.len() {
                    return Err(DbalError::validation(format!(
                        "range start {start} is beyond blob '{key}' size {}",
                        entry.data.len()
                    )));
                }
                let end = (end as usize + 1).min(entry.data.len());
                Ok(entry.data[start..end].to_vec())
            }
            None => Ok(entry.data.clone()),
        }
    }

    async fn delete(&self, ctx: &mut TenantContext, key: &str) -> Result<()> {
        ctx.authorize(Action::Delete, BLOB_RESOURCE)?;
        let mut guard = self.entries.lock().expect("memory blob store poisoned");
        let entry = guard
            .remove(key)
            .ok_or_else(|| DbalError::not_found(format!("blob '{key}'")))?;
        let size = entry.data.len() as u64;
        drop(guard);
        ctx.quota.record_blob_deleted(size);
        Ok(())
    }

    async fn exists(&self, ctx: &TenantContext, key: &str) -> Result<bool> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        Ok(guard.contains_key(key))
    }

    async fn get_metadata(&self, ctx: &TenantContext, key: &str) -> Result<BlobMetadata> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        let entry = guard
            .get(key)
            .ok_or_else(|| DbalError::not_found(format!("blob '{key}'")))?;
        Ok(BlobMetadata {
            key: key.to_string(),
            size: entry.data.len() as u64,
            etag: etag_of(&entry.data),
            content_type: entry.content_type.clone(),
            last_modified: entry.last_modified,
            custom_metadata: entry.custom_metadata.clone(),
        })
    }

    async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<BlobListResult> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        let mut keys: Vec<&String> = guard
            .keys()
            .filter(|k| options.prefix.as_ref().map(|p| k.starts_with(p.as_str())).unwrap_or(true))
            .filter(|k| options.continuation_token.as_ref().map(|t| k.as_str() > t.as_str()).unwrap_or(true))
            .collect();
        keys.sort();

        let max = options.max_keys.unwrap_or(1000) as usize;
        let is_truncated = keys.len() > max;
        let items: Vec<BlobMetadata> = keys
            .into_iter()
            .take(max)
            .map(|key| {
                let entry = &guard[key];
                BlobMetadata {
                    key: key.clone(),
                    size: entry.data.len() as u64,
                    etag: etag_of(&entry.data),
                    content_type: entry.content_type.clone(),
                    last_modified: entry.last_modified,
                    custom_metadata: entry.custom_metadata.clone(),
                }
            })
            .collect();

        let next_continuation_token = is_truncated.then(|| items.last().map(|m| m.key.clone())).flatten();
        Ok(BlobListResult { items, next_continuation_token, is_truncated })
    }

    async fn generate_presigned_url(&self, ctx: &TenantContext, key: &str, _expires_in_secs: u64) -> Result<String> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        Ok(format!("memory://{key}"))
    }

    async fn total_size(&self, ctx: &TenantContext) -> Result<u64> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        Ok(guard.values().map(|e| e.data.len() as u64).sum())
    }

    async fn object_count(&self, ctx: &TenantContext) -> Result<u64> {
        ctx.authorize(Action::Read, BLOB_RESOURCE)?;
        let guard = self.entries.lock().expect("memory blob store poisoned");
        Ok(guard.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantContext;

    fn ctx() -> TenantContext {
        TenantContext::unrestricted("tenant-1", "user-1")
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let backend = MemoryBackend::new();
        backend.upload(&mut ctx(), "a.txt", b"hello".to_vec(), &UploadOptions::default()).await.unwrap();
        let data = backend.download(&ctx(), "a.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn download_missing_key_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.download(&ctx(), "ghost", &DownloadOptions::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn download_range_starting_past_end_is_rejected() {
        let backend = MemoryBackend::new();
        backend.upload(&mut ctx(), "a.txt", b"hello".to_vec(), &UploadOptions::default()).await.unwrap();
        let err = backend
            .download(&ctx(), "a.txt", &DownloadOptions { range: Some((10, 20)) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn upload_without_overwrite_conflicts_on_existing_key() {
        let backend = MemoryBackend::new();
        backend.upload(&mut ctx(), "a.txt", b"hello".to_vec(), &UploadOptions::default()).await.unwrap();
        let err = backend
            .upload(&mut ctx(), "a.txt", b"again".to_vec(), &UploadOptions { overwrite: false, ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let backend = MemoryBackend::new();
        backend.upload(&mut ctx(), "a/1", vec![1], &UploadOptions::default()).await.unwrap();
        backend.upload(&mut ctx(), "b/1", vec![1], &UploadOptions::default()).await.unwrap();
        let result = backend
            .list(&ctx(), &ListOptions { prefix: Some("a/".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].key, "a/1");
    }

    #[tokio::test]
    async fn list_resumes_after_continuation_token() {
        let backend = MemoryBackend::new();
        for key in ["a", "b", "c"] {
            backend.upload(&mut ctx(), key, vec![1], &UploadOptions::default()).await.unwrap();
        }
        let result = backend
            .list(&ctx(), &ListOptions { continuation_token: Some("a".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(result.items.iter().map(|m| m.key.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn list_truncation_reports_resumable_token() {
        let backend = MemoryBackend::new();
        for key in ["a", "b", "c"] {
            backend.upload(&mut ctx(), key, vec![1], &UploadOptions::default()).await.unwrap();
        }
        let result = backend
            .list(&ctx(), &ListOptions { max_keys: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert!(result.is_truncated);
        assert_eq!(result.next_continuation_token.as_deref(), Some("b"));
    }
}
