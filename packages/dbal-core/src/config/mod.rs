//! Environment-driven configuration
//!
//! Deployments select and configure a blob backend purely through
//! environment variables, following the same "read env, build a typed
//! config, hand it to a factory" shape the SQL connection setup uses for
//! its own PRAGMA defaults.

use crate::blob::{filesystem::FilesystemBackend, memory::MemoryBackend, s3::S3Backend, s3::S3Config, BlobStorage};
use crate::error::{DbalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackendKind {
    Memory,
    Filesystem,
    S3,
}

impl BlobBackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "memory" => Some(Self::Memory),
            "filesystem" | "fs" => Some(Self::Filesystem),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlobBackendConfig {
    pub kind: BlobBackendKind,
    pub filesystem_root: Option<String>,
    pub s3: Option<S3Config>,
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(default)
}

impl BlobBackendConfig {
    /// Build configuration from `DBAL_BLOB_*` environment variables,
    /// defaulting to the in-memory backend when `DBAL_BLOB_BACKEND` is unset.
    pub fn from_env() -> Result<Self> {
        let kind = match env("DBAL_BLOB_BACKEND") {
            Some(raw) => BlobBackendKind::parse(&raw)
                .ok_or_else(|| DbalError::validation(format!("unknown DBAL_BLOB_BACKEND '{raw}'")))?,
            None => BlobBackendKind::Memory,
        };

        let filesystem_root = env("DBAL_BLOB_DIR");
        let s3 = if kind == BlobBackendKind::S3 {
            Some(S3Config {
                endpoint: env("DBAL_BLOB_URL")
                    .ok_or_else(|| DbalError::validation("DBAL_BLOB_URL is required for the s3 backend".to_string()))?,
                bucket: env("DBAL_BLOB_BUCKET")
                    .ok_or_else(|| DbalError::validation("DBAL_BLOB_BUCKET is required for the s3 backend".to_string()))?,
                region: env("DBAL_BLOB_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key: env("DBAL_BLOB_ACCESS_KEY")
                    .ok_or_else(|| DbalError::validation("DBAL_BLOB_ACCESS_KEY is required for the s3 backend".to_string()))?,
                secret_key: env("DBAL_BLOB_SECRET_KEY")
                    .ok_or_else(|| DbalError::validation("DBAL_BLOB_SECRET_KEY is required for the s3 backend".to_string()))?,
                use_path_style: env_bool("DBAL_BLOB_PATH_STYLE", true),
                use_ssl: env_bool("DBAL_BLOB_USE_SSL", true),
            })
        } else {
            None
        };

        Ok(Self { kind, filesystem_root, s3 })
    }
}

/// Construct the configured backend as a boxed trait object.
pub fn build_blob_backend(config: &BlobBackendConfig) -> Result<Box<dyn BlobStorage>> {
    match config.kind {
        BlobBackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
        BlobBackendKind::Filesystem => {
            let root = config
                .filesystem_root
                .as_deref()
                .ok_or_else(|| DbalError::validation("DBAL_BLOB_DIR is required for the filesystem backend".to_string()))?;
            Ok(Box::new(FilesystemBackend::new(root)?))
        }
        BlobBackendKind::S3 => {
            let s3_config = config
                .s3
                .clone()
                .ok_or_else(|| DbalError::validation("missing s3 configuration".to_string()))?;
            Ok(Box::new(S3Backend::new(s3_config)))
        }
    }
}
