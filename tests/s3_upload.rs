//! Signed uploads against a local S3-compatible endpoint.

use mockito::Matcher;
use n1_release::ReleaseError;
use n1_release::publish::checksum::sha256_hex;
use n1_release::publish::{
    Credentials, ObjectStore, PUBLIC_READ, PutObject, S3Store, UploadProgress,
};
use std::sync::Arc;

fn credentials() -> Credentials {
    Credentials {
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
    }
}

#[tokio::test]
async fn streams_signed_put_with_public_acl() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("nylas-2.1.0-amd64.deb");
    let body = "debian-package-bytes\n".repeat(4096);
    std::fs::write(&source, &body).unwrap();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/edgehill/2.1.0-abc1234/linux-deb/x64/N1.deb")
        .match_header("x-amz-acl", PUBLIC_READ)
        .match_header("content-type", "application/x-deb")
        .match_header("x-amz-content-sha256", sha256_hex(&body).as_str())
        .match_header(
            "authorization",
            Matcher::Regex(
                r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/s3/aws4_request, SignedHeaders=content-type;host;x-amz-acl;x-amz-content-sha256;x-amz-date, Signature=[0-9a-f]{64}$"
                    .to_string(),
            ),
        )
        .match_body(body.as_str())
        .with_status(200)
        .create_async()
        .await;

    let store = S3Store::new(credentials(), "us-east-1")
        .with_endpoint(&server.url())
        .unwrap();
    let request = PutObject {
        source,
        bucket: "edgehill".into(),
        key: "2.1.0-abc1234/linux-deb/x64/N1.deb".into(),
        acl: PUBLIC_READ.into(),
        content_type: Some("application/x-deb".into()),
    };
    let progress = Arc::new(UploadProgress::new(request.key.as_str()));

    let stored = store.put_object(&request, progress.clone()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(stored.key, request.key);
    assert_eq!(
        stored.location,
        format!("{}/edgehill/2.1.0-abc1234/linux-deb/x64/N1.deb", server.url())
    );
    assert_eq!(progress.percent(), 100);
}

#[tokio::test]
async fn rejected_put_names_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("N1.zip");
    std::fs::write(&source, b"zip").unwrap();

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PUT", "/edgehill/2.1.0-abc1234/darwin/x64/N1.zip")
        .with_status(403)
        .with_body("<Error><Code>AccessDenied</Code></Error>")
        .create_async()
        .await;

    let store = S3Store::new(credentials(), "us-east-1")
        .with_endpoint(&server.url())
        .unwrap();
    let request = PutObject {
        source,
        bucket: "edgehill".into(),
        key: "2.1.0-abc1234/darwin/x64/N1.zip".into(),
        acl: PUBLIC_READ.into(),
        content_type: None,
    };

    let err = store
        .put_object(&request, Arc::new(UploadProgress::new("N1.zip")))
        .await
        .unwrap_err();

    match err {
        ReleaseError::Upload { key, reason } => {
            assert_eq!(key, "2.1.0-abc1234/darwin/x64/N1.zip");
            assert!(reason.contains("403"));
            assert!(reason.contains("AccessDenied"));
        }
        other => panic!("expected upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_artifact_is_a_filesystem_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = S3Store::new(credentials(), "us-east-1")
        .with_endpoint("http://127.0.0.1:9")
        .unwrap();
    let request = PutObject {
        source: dir.path().join("RELEASES"),
        bucket: "edgehill".into(),
        key: "2.1.0-abc1234/win32/ia32/RELEASES".into(),
        acl: PUBLIC_READ.into(),
        content_type: None,
    };

    let err = store
        .put_object(&request, Arc::new(UploadProgress::new("RELEASES")))
        .await
        .unwrap_err();

    assert!(matches!(err, ReleaseError::Fs { .. }));
}
