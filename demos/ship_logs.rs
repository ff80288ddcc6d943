//! Example: ship structured logs to an ingestion endpoint
//!
//! Run with: cargo run --example ship_logs

use logship::client::LogShip;
use logship::config::ClientOptions;
use logship::types::Record;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logship=debug".into()),
        )
        .init();

    let credential = std::env::var("LOGSHIP_API_KEY").unwrap_or_else(|_| "demo-key".to_string());

    let options = ClientOptions {
        endpoint: std::env::var("LOGSHIP_ENDPOINT").ok(),
        flush_interval: Some(Duration::from_millis(500)),
        file_backup_dir: Some(std::env::temp_dir().join("logship-demo")),
        error_handler: Some(Arc::new(|err| {
            eprintln!("delivery failure: {}", err);
        })),
        ..Default::default()
    };

    let client = LogShip::build(credential, Some(options)).await?;

    for i in 0..10 {
        let mut fields = HashMap::new();
        fields.insert("event".to_string(), Value::String("heartbeat".to_string()));
        fields.insert("iteration".to_string(), Value::from(i));
        client.append("demo.heartbeat", &Record::now(fields))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("buffered: {} bytes", client.buffered_bytes());
    client.flush().await?;
    client.close().await?;
    Ok(())
}
