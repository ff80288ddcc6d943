//! Integration tests for LogShip

use logship::client::LogShip;
use logship::config::ClientOptions;
use logship::ingest::sender::TAG_HEADER;
use logship::types::Record;
use logship::LogShipError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Helper to point a client at a mock ingestion server
fn options_for(server: &mockito::Server) -> ClientOptions {
    ClientOptions {
        endpoint: Some(format!("{}/v1/chunks", server.url())),
        flush_interval: Some(Duration::from_millis(50)),
        wait_until_buffer_flushed: Some(Duration::from_secs(5)),
        wait_until_flusher_terminated: Some(Duration::from_secs(5)),
        ..Default::default()
    }
}

fn sample_fields(event: &str) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("event".to_string(), Value::String(event.to_string()));
    fields
}

/// Test the full append -> flush -> deliver pipeline
#[tokio::test]
async fn test_end_to_end_delivery() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chunks")
        .match_header("authorization", "Bearer integration-key")
        .match_header(TAG_HEADER, "app.access")
        .match_body(mockito::Matcher::Regex("\"event\":\"login\"".to_string()))
        .with_status(200)
        .create_async()
        .await;

    let client = LogShip::build("integration-key", Some(options_for(&server)))
        .await
        .unwrap();

    client
        .append("app.access", &Record::now(sample_fields("login")))
        .unwrap();
    assert!(client.buffered_bytes() > 0);

    client.flush().await.unwrap();
    assert_eq!(client.buffered_bytes(), 0);
    mock.assert_async().await;

    client.close().await.unwrap();
}

/// Test that the periodic flush worker delivers without an explicit flush
#[tokio::test]
async fn test_scheduled_flush_delivers_rotated_chunks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chunks")
        .with_status(200)
        .create_async()
        .await;

    // Tiny retention so a single record rotates its chunk immediately
    let options = ClientOptions {
        chunk_retention_size: Some(8),
        ..options_for(&server)
    };
    let client = LogShip::build("key", Some(options)).await.unwrap();

    client.append_now("app", sample_fields("tick")).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(client.buffered_bytes(), 0);
    mock.assert_async().await;
    client.close().await.unwrap();
}

/// Test that close drains data that never reached the retention size
#[tokio::test]
async fn test_close_drains_remaining_data() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chunks")
        .with_status(200)
        .create_async()
        .await;

    let options = ClientOptions {
        // Interval long enough that only close can deliver
        flush_interval: Some(Duration::from_secs(3600)),
        ..options_for(&server)
    };
    let client = LogShip::build("key", Some(options)).await.unwrap();

    client
        .append("app", &Record::now(sample_fields("shutdown")))
        .unwrap();
    client.close().await.unwrap();

    assert_eq!(client.buffered_bytes(), 0);
    mock.assert_async().await;

    // The handle refuses work after close
    assert!(matches!(
        client.append("app", &Record::now(HashMap::new())),
        Err(LogShipError::Closed)
    ));
    assert!(matches!(client.flush().await, Err(LogShipError::Closed)));

    // Closing twice is a no-op
    client.close().await.unwrap();
}

/// Test that delivery failures reach the user-supplied error handler
#[tokio::test]
async fn test_error_handler_invoked_on_rejected_delivery() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chunks")
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let invocations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invocations);

    let options = ClientOptions {
        error_handler: Some(Arc::new(move |err| {
            assert!(matches!(err, LogShipError::Delivery { .. }));
            seen.fetch_add(1, Ordering::SeqCst);
        })),
        flush_interval: Some(Duration::from_secs(3600)),
        ..options_for(&server)
    };
    let client = LogShip::build("revoked-key", Some(options)).await.unwrap();

    client
        .append("app", &Record::now(sample_fields("denied")))
        .unwrap();
    client.flush().await.unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    mock.assert_async().await;
    client.close().await.unwrap();
}

/// Test that unflushed data survives a close/build cycle via the backup dir
#[tokio::test]
async fn test_backup_persists_across_restart() {
    let backup_dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    // First run: a zero drain wait means close makes no delivery attempt, so
    // the unflushed chunk lands in the backup directory instead.
    let options = ClientOptions {
        file_backup_dir: Some(backup_dir.path().to_path_buf()),
        flush_interval: Some(Duration::from_secs(3600)),
        wait_until_buffer_flushed: Some(Duration::from_millis(0)),
        ..options_for(&server)
    };
    let client = LogShip::build("key", Some(options)).await.unwrap();
    client
        .append("app.audit", &Record::now(sample_fields("persisted")))
        .unwrap();
    client.close().await.unwrap();

    // Second run: the accepting endpoint receives the restored chunk
    let accepted = server
        .mock("POST", "/v1/chunks")
        .match_header(TAG_HEADER, "app.audit")
        .match_body(mockito::Matcher::Regex("\"event\":\"persisted\"".to_string()))
        .with_status(200)
        .create_async()
        .await;

    let options = ClientOptions {
        file_backup_dir: Some(backup_dir.path().to_path_buf()),
        flush_interval: Some(Duration::from_secs(3600)),
        ..options_for(&server)
    };
    let restored = LogShip::build("key", Some(options)).await.unwrap();
    assert!(restored.buffered_bytes() > 0);

    restored.flush().await.unwrap();
    accepted.assert_async().await;
    restored.close().await.unwrap();
}

/// Test that an invalid configuration fails without starting anything
#[tokio::test]
async fn test_invalid_credential_fails_fast() {
    let result = LogShip::build("", None).await;
    assert!(matches!(
        result,
        Err(LogShipError::InvalidConfiguration(_))
    ));
}
