//! Tenant authorization and quota context
//!
//! Every blob and structured-record access carries a [`TenantContext`]: an
//! identity (role + permission strings) and a mutable quota. Role `owner`
//! and `admin` are unconditionally permitted; every other role needs an
//! explicit `<action>:*` or `<action>:<resource>` permission string.

use std::collections::HashSet;

use crate::error::{DbalError, Result};

pub mod quota;
pub use quota::TenantQuota;

/// A tenant's role. Only `Owner`/`Admin` bypass the permission-string check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    fn is_unconditionally_permitted(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// The action half of a `<action>:<resource>` permission string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

/// Identity half of a tenant context.
#[derive(Debug, Clone)]
pub struct TenantIdentity {
    pub tenant_id: String,
    pub user_id: String,
    pub role: Role,
    /// Permission strings of the form `<action>:<resource>`, where
    /// `resource` may be the literal `*`.
    pub permissions: HashSet<String>,
}

impl TenantIdentity {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            role,
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
}

/// Identity + quota for a single tenant access.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub identity: TenantIdentity,
    pub quota: TenantQuota,
}

impl TenantContext {
    pub fn new(identity: TenantIdentity, quota: TenantQuota) -> Self {
        Self { identity, quota }
    }

    /// Unrestricted context for tests and single-tenant deployments.
    pub fn unrestricted(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(
            TenantIdentity::new(tenant_id, user_id, Role::Owner),
            TenantQuota::default(),
        )
    }

    fn has_permission(&self, action: Action, resource: &str) -> bool {
        if self.identity.role.is_unconditionally_permitted() {
            return true;
        }
        let wildcard = format!("{}:*", action.as_str());
        let specific = format!("{}:{}", action.as_str(), resource);
        self.identity.permissions.contains(&wildcard) || self.identity.permissions.contains(&specific)
    }

    pub fn can_read(&self, resource: &str) -> bool {
        self.has_permission(Action::Read, resource)
    }

    pub fn can_write(&self, resource: &str) -> bool {
        self.has_permission(Action::Write, resource)
    }

    pub fn can_delete(&self, resource: &str) -> bool {
        self.has_permission(Action::Delete, resource)
    }

    /// Enforce the authorization rule for a single `(action, resource)` pair,
    /// returning `Forbidden` rather than a bare bool.
    pub fn authorize(&self, action: Action, resource: &str) -> Result<()> {
        if self.has_permission(action, resource) {
            Ok(())
        } else {
            Err(DbalError::forbidden(format!(
                "role '{:?}' lacks {}:{} permission",
                self.identity.role,
                action.as_str(),
                resource
            )))
        }
    }
}
