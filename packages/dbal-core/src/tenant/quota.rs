//! Per-tenant quota ceilings and usage counters
//!
//! Writes that would exceed a ceiling are rejected with
//! [`crate::error::DbalError::RateLimitExceeded`] *before* any I/O is
//! attempted.

use crate::error::{DbalError, Result};

/// Ceilings are `None` when unbounded; counters always start at zero.
#[derive(Debug, Clone, Default)]
pub struct TenantQuota {
    pub max_blob_storage_bytes: Option<u64>,
    pub max_blob_count: Option<u64>,
    pub max_blob_size_bytes: Option<u64>,
    pub max_records: Option<u64>,
    pub max_data_size_bytes: Option<u64>,
    pub max_list_length: Option<u64>,

    pub current_blob_storage_bytes: u64,
    pub current_blob_count: u64,
    pub current_records: u64,
    pub current_data_size_bytes: u64,
}

impl TenantQuota {
    /// Admit a blob upload of `size_bytes`, checking the per-object ceiling,
    /// the aggregate storage ceiling, and the object-count ceiling.
    pub fn check_blob_upload(&self, size_bytes: u64) -> Result<()> {
        if let Some(max) = self.max_blob_size_bytes {
            if size_bytes > max {
                return Err(DbalError::validation(format!(
                    "blob size {size_bytes} exceeds max_blob_size_bytes {max}"
                )));
            }
        }
        if let Some(max) = self.max_blob_storage_bytes {
            if self.current_blob_storage_bytes.saturating_add(size_bytes) > max {
                return Err(DbalError::rate_limit(format!(
                    "upload would exceed max_blob_storage_bytes {max}"
                )));
            }
        }
        if let Some(max) = self.max_blob_count {
            if self.current_blob_count >= max {
                return Err(DbalError::rate_limit(format!(
                    "blob count at max_blob_count {max}"
                )));
            }
        }
        Ok(())
    }

    /// Admit creation of one record.
    pub fn check_create_record(&self) -> Result<()> {
        if let Some(max) = self.max_records {
            if self.current_records >= max {
                return Err(DbalError::rate_limit(format!(
                    "record count at max_records {max}"
                )));
            }
        }
        Ok(())
    }

    /// Admit growing a list result or a bulk operation by `additional_items`.
    pub fn check_list_length(&self, additional_items: u64) -> Result<()> {
        if let Some(max) = self.max_list_length {
            if additional_items > max {
                return Err(DbalError::validation(format!(
                    "requested length {additional_items} exceeds max_list_length {max}"
                )));
            }
        }
        Ok(())
    }

    /// Admit a write of `size_bytes` of structured data.
    pub fn check_data_size(&self, size_bytes: u64) -> Result<()> {
        if let Some(max) = self.max_data_size_bytes {
            if self.current_data_size_bytes.saturating_add(size_bytes) > max {
                return Err(DbalError::rate_limit(format!(
                    "write would exceed max_data_size_bytes {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn record_blob_uploaded(&mut self, size_bytes: u64) {
        self.current_blob_storage_bytes += size_bytes;
        self.current_blob_count += 1;
    }

    pub fn record_blob_deleted(&mut self, size_bytes: u64) {
        self.current_blob_storage_bytes = self.current_blob_storage_bytes.saturating_sub(size_bytes);
        self.current_blob_count = self.current_blob_count.saturating_sub(1);
    }

    pub fn record_created(&mut self, data_size_bytes: u64) {
        self.current_records += 1;
        self.current_data_size_bytes += data_size_bytes;
    }

    pub fn record_removed(&mut self, data_size_bytes: u64) {
        self.current_records = self.current_records.saturating_sub(1);
        self.current_data_size_bytes =
            self.current_data_size_bytes.saturating_sub(data_size_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_quota_admits_everything() {
        let quota = TenantQuota::default();
        assert!(quota.check_blob_upload(u64::MAX / 2).is_ok());
        assert!(quota.check_create_record().is_ok());
        assert!(quota.check_list_length(10_000).is_ok());
    }

    #[test]
    fn blob_count_ceiling_rejects_before_io() {
        let quota = TenantQuota {
            max_blob_count: Some(1),
            current_blob_count: 1,
            ..Default::default()
        };
        let err = quota.check_blob_upload(1).unwrap_err();
        assert_eq!(err.status_code(), 429);
    }

    #[test]
    fn blob_size_ceiling_rejects_oversized_object() {
        let quota = TenantQuota {
            max_blob_size_bytes: Some(100),
            ..Default::default()
        };
        let err = quota.check_blob_upload(101).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn record_ceiling_rejects_at_limit() {
        let quota = TenantQuota {
            max_records: Some(2),
            current_records: 2,
            ..Default::default()
        };
        assert!(quota.check_create_record().is_err());
    }
}
