use dbal_core::tenant::{Role, TenantContext, TenantIdentity, TenantQuota};

#[test]
fn owner_bypasses_permission_strings_entirely() {
    let identity = TenantIdentity::new("tenant-1", "user-1", Role::Owner);
    let ctx = TenantContext::new(identity, TenantQuota::default());
    assert!(ctx.can_read("posts"));
    assert!(ctx.can_write("posts"));
    assert!(ctx.can_delete("posts"));
}

#[test]
fn member_needs_an_explicit_permission_string() {
    let identity = TenantIdentity::new("tenant-1", "user-2", Role::Member).with_permission("read:posts");
    let ctx = TenantContext::new(identity, TenantQuota::default());
    assert!(ctx.can_read("posts"));
    assert!(!ctx.can_write("posts"));
}

#[test]
fn wildcard_permission_covers_every_resource() {
    let identity = TenantIdentity::new("tenant-1", "user-3", Role::Member).with_permission("write:*");
    let ctx = TenantContext::new(identity, TenantQuota::default());
    assert!(ctx.can_write("posts"));
    assert!(ctx.can_write("comments"));
    assert!(!ctx.can_delete("posts"));
}

#[test]
fn authorize_returns_forbidden_not_a_bare_bool() {
    let identity = TenantIdentity::new("tenant-1", "user-4", Role::Viewer);
    let ctx = TenantContext::new(identity, TenantQuota::default());
    let err = ctx.authorize(dbal_core::tenant::Action::Write, "posts").unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn quota_blocks_writes_before_any_io_is_attempted() {
    let mut quota = TenantQuota { max_records: Some(1), ..Default::default() };
    quota.record_created(10);
    let err = quota.check_create_record().unwrap_err();
    assert_eq!(err.status_code(), 429);
}
