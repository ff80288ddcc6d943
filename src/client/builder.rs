//! Client assembly: credential validation, default resolution and wiring.
//!
//! This is a straight-through validation-then-construction pipeline. It does
//! no I/O and no retries of its own, never swallows an error, and either
//! returns a fully-wired [`LogShip`] or fails before anything has started.
//! Construction follows a strict dependency chain (formatter, buffer,
//! sender, ingester, flusher) so no component ever sees an uninitialized
//! dependency, and the flush worker, the only background activity, is
//! spawned as the final step.

use crate::buffer::Buffer;
use crate::client::LogShip;
use crate::config::{merge, ClientOptions};
use crate::flusher::AsyncFlusher;
use crate::ingest::{Ingester, SenderConfig};
use crate::types::RecordFormatter;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) async fn build(credential: String, options: Option<ClientOptions>) -> Result<LogShip> {
    // Credential validation comes first: an invalid configuration must fail
    // before any resolution work or allocation.
    let sender_config = sender_config_from(credential, options.as_ref())?;
    let topology = merge(options.as_ref());

    let formatter = RecordFormatter::new(&topology.formatter);
    let buffer = Arc::new(Buffer::new(topology.buffer)?);
    let sender = sender_config.create_instance()?;
    let ingester = Ingester::new(sender);
    let flusher = AsyncFlusher::start(topology.flusher, Arc::clone(&buffer), ingester);

    Ok(LogShip {
        formatter,
        buffer,
        flusher,
        closed: AtomicBool::new(false),
    })
}

/// Build the sender configuration from the credential and user options.
///
/// The endpoint override is only applied when the user supplied one; the
/// sender's compiled-in default is never spelled out here. A user-supplied
/// error handler is forwarded as-is.
fn sender_config_from(credential: String, options: Option<&ClientOptions>) -> Result<SenderConfig> {
    let mut sender_config = SenderConfig::new(credential)?;

    if let Some(options) = options {
        if let Some(endpoint) = &options.endpoint {
            sender_config.set_endpoint(endpoint.clone());
        }
        if let Some(handler) = &options.error_handler {
            sender_config.set_error_handler(Arc::clone(handler));
        }
    }

    Ok(sender_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogShipError;
    use std::sync::Arc;

    #[test]
    fn test_empty_credential_fails_before_construction() {
        let result = sender_config_from(String::new(), None);
        assert!(matches!(
            result,
            Err(LogShipError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_no_endpoint_means_no_override() {
        let config = sender_config_from("key".to_string(), Some(&ClientOptions::default())).unwrap();
        assert!(config.endpoint_override().is_none());
    }

    #[test]
    fn test_endpoint_override_is_forwarded_verbatim() {
        let options = ClientOptions {
            endpoint: Some("https://custom.example.com/v1".to_string()),
            ..Default::default()
        };
        let config = sender_config_from("key".to_string(), Some(&options)).unwrap();
        assert_eq!(
            config.endpoint_override(),
            Some("https://custom.example.com/v1")
        );
    }

    #[test]
    fn test_error_handler_forwarded_by_identity() {
        let handler: crate::ingest::ErrorHandler = Arc::new(|_| {});
        let options = ClientOptions {
            error_handler: Some(Arc::clone(&handler)),
            ..Default::default()
        };

        let config = sender_config_from("key".to_string(), Some(&options)).unwrap();
        let forwarded = config.error_handler().unwrap();
        assert!(Arc::ptr_eq(forwarded, &handler));
    }

    #[tokio::test]
    async fn test_build_with_defaults_returns_idle_handle() {
        let client = LogShip::build("valid-key", None).await.unwrap();
        assert_eq!(client.buffered_bytes(), 0);
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_rejects_empty_credential() {
        let result = LogShip::build("", Some(ClientOptions::default())).await;
        assert!(matches!(
            result,
            Err(LogShipError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_build_fails_when_backup_dir_unusable() {
        // A file standing where the backup directory should be
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"occupied").unwrap();

        let options = ClientOptions {
            file_backup_dir: Some(blocker),
            ..Default::default()
        };
        let result = LogShip::build("key", Some(options)).await;
        assert!(matches!(
            result,
            Err(LogShipError::ComponentConstruction(_))
        ));
    }
}
