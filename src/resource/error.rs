//! Error types for resource fetching

use std::time::Duration;

/// Why a dataset could not be fetched.
///
/// Every network-layer failure is converted into one of these at the fetcher
/// boundary, so bindings only ever see failures as values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
  #[error("{endpoint} returned HTTP {status}")]
  Http { endpoint: String, status: u16 },

  #[error("request to {endpoint} failed: {message}")]
  Transport { endpoint: String, message: String },

  #[error("invalid response from {endpoint}: {message}")]
  Decode { endpoint: String, message: String },

  #[error("timed out after {}s", .after.as_secs())]
  Timeout { after: Duration },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let err = FetchError::Http {
      endpoint: "hosting/servers".to_string(),
      status: 502,
    };
    assert_eq!(err.to_string(), "hosting/servers returned HTTP 502");

    let err = FetchError::Timeout {
      after: Duration::from_secs(20),
    };
    assert_eq!(err.to_string(), "timed out after 20s");
  }
}
