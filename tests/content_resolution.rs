//! Image content resolution through the injected resolver.

use std::fs;

use arrowlabel::{ArrowlabelError, ContentResolver, FileResolver, Image};

#[test]
fn file_resolver_reads_uri_content() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("0001.png"), b"png-bytes").unwrap();

    let resolver = FileResolver::with_root(dir.path());
    let image = Image::from_uri("0001.png");
    assert_eq!(
        image.content(&resolver).unwrap(),
        Some(b"png-bytes".to_vec())
    );
}

#[test]
fn explicit_bytes_shadow_the_uri() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("0001.png"), b"file-bytes").unwrap();

    let resolver = FileResolver::with_root(dir.path());
    let image = Image::new(
        Some("0001.png".into()),
        Some(b"inline-bytes".to_vec()),
        None,
    );
    assert_eq!(
        image.content(&resolver).unwrap(),
        Some(b"inline-bytes".to_vec())
    );
}

#[test]
fn read_failures_propagate_as_content_read() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = FileResolver::with_root(dir.path());
    let image = Image::from_uri("missing.png");
    assert!(matches!(
        image.content(&resolver),
        Err(ArrowlabelError::ContentRead { .. })
    ));
}

#[test]
fn absent_image_resolves_to_absent_content() {
    let resolver = FileResolver::new();
    let image = Image::default();
    assert_eq!(image.content(&resolver).unwrap(), None);
    assert_eq!(image.url(&resolver).unwrap(), "");
}
