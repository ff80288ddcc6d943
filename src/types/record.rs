//! Log record types and the line formatter

use crate::config::FormatterConfig;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Type alias for record fields
pub type RecordFields = HashMap<String, Value>;

/// A structured log record to be buffered and shipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Event time of the record
    pub time: DateTime<Utc>,

    /// Structured fields carried by the record
    pub fields: RecordFields,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn now(fields: RecordFields) -> Self {
        Self {
            time: Utc::now(),
            fields,
        }
    }

    /// Create a record with an explicit event time
    pub fn with_time(time: DateTime<Utc>, fields: RecordFields) -> Self {
        Self { time, fields }
    }
}

/// Formats records into newline-delimited JSON lines for buffering.
///
/// Process metadata (hostname, pid) is captured once at construction and
/// stamped onto every formatted line. Reserved keys (`tag`, `time`,
/// `hostname`, `pid`) always win over user fields of the same name.
pub struct RecordFormatter {
    hostname: Option<String>,
    pid: Option<u32>,
}

impl RecordFormatter {
    /// Create a formatter from a resolved formatter configuration
    pub fn new(config: &FormatterConfig) -> Self {
        if config.include_process_metadata {
            let hostname = gethostname::gethostname().to_string_lossy().to_string();
            Self {
                hostname: Some(hostname),
                pid: Some(std::process::id()),
            }
        } else {
            Self {
                hostname: None,
                pid: None,
            }
        }
    }

    /// Encode a tagged record as a single JSON line (newline terminated)
    pub fn format(&self, tag: &str, record: &Record) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();

        for (key, value) in &record.fields {
            map.insert(key.clone(), value.clone());
        }

        map.insert("tag".to_string(), Value::String(tag.to_string()));
        map.insert("time".to_string(), Value::String(record.time.to_rfc3339()));
        if let Some(hostname) = &self.hostname {
            map.insert("hostname".to_string(), Value::String(hostname.clone()));
        }
        if let Some(pid) = self.pid {
            map.insert("pid".to_string(), Value::from(pid));
        }

        let mut line = serde_json::to_vec(&Value::Object(map))?;
        line.push(b'\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> RecordFields {
        let mut fields = HashMap::new();
        fields.insert("event".to_string(), Value::String("login".to_string()));
        fields.insert("attempt".to_string(), Value::from(3));
        fields
    }

    #[test]
    fn test_format_contains_tag_time_and_fields() {
        let formatter = RecordFormatter::new(&FormatterConfig {
            include_process_metadata: false,
        });
        let record = Record::now(sample_fields());

        let line = formatter.format("app.access", &record).unwrap();
        assert_eq!(*line.last().unwrap(), b'\n');

        let parsed: Value = serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(parsed["tag"], "app.access");
        assert_eq!(parsed["event"], "login");
        assert_eq!(parsed["attempt"], 3);
        assert!(parsed["time"].is_string());
        assert!(parsed.get("hostname").is_none());
        assert!(parsed.get("pid").is_none());
    }

    #[test]
    fn test_format_stamps_process_metadata() {
        let formatter = RecordFormatter::new(&FormatterConfig {
            include_process_metadata: true,
        });
        let record = Record::now(HashMap::new());

        let line = formatter.format("app", &record).unwrap();
        let parsed: Value = serde_json::from_slice(&line[..line.len() - 1]).unwrap();

        assert!(!parsed["hostname"].as_str().unwrap().is_empty());
        assert_eq!(parsed["pid"].as_u64().unwrap(), u64::from(std::process::id()));
    }

    #[test]
    fn test_reserved_keys_win_over_user_fields() {
        let formatter = RecordFormatter::new(&FormatterConfig {
            include_process_metadata: false,
        });
        let mut fields = HashMap::new();
        fields.insert("tag".to_string(), Value::String("spoofed".to_string()));

        let line = formatter.format("real.tag", &Record::now(fields)).unwrap();
        let parsed: Value = serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(parsed["tag"], "real.tag");
    }

    #[test]
    fn test_with_time_preserves_event_time() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = Record::with_time(time, HashMap::new());
        assert_eq!(record.time, time);
    }
}
