//! Cached snapshot types and their on-disk envelope.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Last-known-good payload for one resource key.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  /// Resource key this entry belongs to (e.g. "hosting-dashboard")
  pub key: String,
  /// Opaque merged snapshot
  pub payload: Value,
  /// When the payload was written, in epoch milliseconds
  pub saved_at_epoch_ms: i64,
}

impl CacheEntry {
  /// Write time as a UTC timestamp.
  pub fn saved_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.saved_at_epoch_ms)
  }

  /// Age of the entry relative to `now`, clamped at zero.
  pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
    self
      .saved_at()
      .map(|saved| (now - saved).max(chrono::Duration::zero()))
      .unwrap_or_else(chrono::Duration::zero)
  }

  /// Decode the payload into a typed page model.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
    T::deserialize(&self.payload)
  }
}

/// Stored form of an entry: `{"data": ..., "timestamp": ...}`.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope {
  pub data: Value,
  pub timestamp: i64,
}

/// Borrowed form of [`Envelope`] for serialization without cloning the payload.
#[derive(Debug, Serialize)]
pub(super) struct EnvelopeRef<'a> {
  pub data: &'a Value,
  pub timestamp: i64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_age_is_clamped_for_future_entries() {
    let entry = CacheEntry {
      key: "hosting".to_string(),
      payload: json!({}),
      saved_at_epoch_ms: Utc::now().timestamp_millis() + 60_000,
    };
    assert_eq!(entry.age(Utc::now()), chrono::Duration::zero());
  }

  #[test]
  fn test_decode_typed_payload() {
    #[derive(Deserialize)]
    struct Servers {
      servers: Vec<String>,
    }

    let entry = CacheEntry {
      key: "hosting".to_string(),
      payload: json!({ "servers": ["a", "b"] }),
      saved_at_epoch_ms: 0,
    };
    let decoded: Servers = entry.decode().unwrap();
    assert_eq!(decoded.servers, vec!["a", "b"]);
  }

  #[test]
  fn test_envelope_requires_timestamp() {
    let parsed = serde_json::from_str::<Envelope>(r#"{"data": {"servers": []}}"#);
    assert!(parsed.is_err());
  }
}
