use dbal_core::blob::filesystem::FilesystemBackend;
use dbal_core::blob::memory::MemoryBackend;
use dbal_core::blob::{BlobStorage, DownloadOptions, ListOptions, UploadOptions};
use dbal_core::tenant::TenantContext;

fn ctx() -> TenantContext {
    TenantContext::unrestricted("tenant-1", "user-1")
}

async fn exercise_backend(backend: &dyn BlobStorage) {
    let meta = backend
        .upload(&mut ctx(), "docs/readme.txt", b"hello world".to_vec(), &UploadOptions::default())
        .await
        .unwrap();
    assert_eq!(meta.size, 11);

    assert!(backend.exists(&ctx(), "docs/readme.txt").await.unwrap());
    assert!(!backend.exists(&ctx(), "docs/missing.txt").await.unwrap());

    let data = backend.download(&ctx(), "docs/readme.txt", &DownloadOptions::default()).await.unwrap();
    assert_eq!(data, b"hello world");

    let ranged = backend
        .download(&ctx(), "docs/readme.txt", &DownloadOptions { range: Some((0, 4)) })
        .await
        .unwrap();
    assert_eq!(ranged, b"hello");

    backend.copy(&mut ctx(), "docs/readme.txt", "docs/readme-copy.txt").await.unwrap();
    assert!(backend.exists(&ctx(), "docs/readme-copy.txt").await.unwrap());

    let listing = backend
        .list(&ctx(), &ListOptions { prefix: Some("docs/".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(listing.items.len(), 2);

    assert_eq!(backend.object_count(&ctx()).await.unwrap(), 2);
    assert!(backend.total_size(&ctx()).await.unwrap() >= 22);

    backend.delete(&mut ctx(), "docs/readme.txt").await.unwrap();
    assert!(!backend.exists(&ctx(), "docs/readme.txt").await.unwrap());

    let err = backend.delete(&mut ctx(), "docs/readme.txt").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn memory_backend_satisfies_the_shared_contract() {
    let backend = MemoryBackend::new();
    exercise_backend(&backend).await;
}

#[tokio::test]
async fn filesystem_backend_satisfies_the_shared_contract() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
    exercise_backend(&backend).await;
}

#[tokio::test]
async fn filesystem_backend_rejects_path_traversal_keys() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemBackend::new(dir.path().to_str().unwrap()).unwrap();
    let err = backend
        .upload(&mut ctx(), "../../etc/passwd", b"x".to_vec(), &UploadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
}
