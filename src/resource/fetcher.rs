//! Dataset fetching: concurrent section requests merged into one snapshot.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::FetchError;
use crate::cache::{CacheEntry, CacheStore};

/// Produces one logical page dataset.
///
/// `previous` is the last cached snapshot for the resource, if any, so
/// implementations can fall back to it for optional sections.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
  async fn fetch_all(&self, previous: Option<&Value>) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  #[default]
  #[serde(alias = "get")]
  Get,
  #[serde(alias = "post")]
  Post,
}

/// One endpoint contributing a named section of a dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
  /// Key of this section in the merged snapshot
  pub name: String,
  /// Path relative to the API base URL
  pub path: String,
  #[serde(default)]
  pub method: Method,
  /// JSON body for POST sections
  #[serde(default)]
  pub body: Option<Value>,
  /// Optional sections may fail without failing the dataset
  #[serde(default)]
  pub optional: bool,
}

impl Section {
  pub fn get(name: &str, path: &str) -> Self {
    Self {
      name: name.to_string(),
      path: path.to_string(),
      method: Method::Get,
      body: None,
      optional: false,
    }
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }
}

/// Something that can perform the request for one section.
#[async_trait]
pub trait SectionSource: Send + Sync {
  async fn request(&self, section: &Section) -> Result<Value, FetchError>;
}

#[async_trait]
impl<S: SectionSource + ?Sized> SectionSource for Arc<S> {
  async fn request(&self, section: &Section) -> Result<Value, FetchError> {
    (**self).request(section).await
  }
}

/// Fetcher that requests every section concurrently and merges the bodies
/// into `{ section name: body }`.
///
/// A failing required section fails the whole dataset. A failing optional
/// section keeps its value from the previous snapshot, or `null` if there is
/// none.
pub struct EndpointFetcher<S> {
  source: S,
  sections: Vec<Section>,
}

impl<S: SectionSource> EndpointFetcher<S> {
  pub fn new(source: S, sections: Vec<Section>) -> Self {
    Self { source, sections }
  }
}

#[async_trait]
impl<S: SectionSource> ResourceFetcher for EndpointFetcher<S> {
  async fn fetch_all(&self, previous: Option<&Value>) -> Result<Value, FetchError> {
    let results = join_all(self.sections.iter().map(|s| self.source.request(s))).await;

    let mut merged = Map::with_capacity(self.sections.len());
    for (section, result) in self.sections.iter().zip(results) {
      let value = match result {
        Ok(value) => value,
        Err(e) if section.optional => {
          warn!(section = %section.name, error = %e, "optional section failed, keeping previous value");
          previous
            .and_then(|p| p.get(&section.name))
            .cloned()
            .unwrap_or(Value::Null)
        }
        Err(e) => return Err(e),
      };
      merged.insert(section.name.clone(), value);
    }

    Ok(Value::Object(merged))
  }
}

/// Why a fetch was issued, which decides how its failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Cold start or manual refresh: loading indicator shown, failures notified
  Foreground,
  /// The silent check shortly after a warm mount: failures notified
  Revalidate,
  /// Periodic refresh: silent, failures only logged
  Background,
}

impl FetchMode {
  pub fn shows_loading(self) -> bool {
    matches!(self, FetchMode::Foreground)
  }

  pub fn notifies_failure(self) -> bool {
    !matches!(self, FetchMode::Background)
  }
}

/// Completed fetch, delivered to the owning binding.
#[derive(Debug)]
pub struct FetchOutcome {
  pub mode: FetchMode,
  pub result: Result<CacheEntry, FetchError>,
}

/// Runs fetches for one resource key.
///
/// Applies the request timeout, writes the snapshot to the cache on success
/// (and only on success), then hands the outcome to the binding. Outcomes
/// arriving after the binding is gone are discarded.
#[derive(Clone)]
pub struct FetchRunner {
  key: String,
  fetcher: Arc<dyn ResourceFetcher>,
  store: CacheStore,
  timeout: Duration,
  outcomes: mpsc::UnboundedSender<FetchOutcome>,
}

impl FetchRunner {
  pub fn new(
    key: impl Into<String>,
    fetcher: Arc<dyn ResourceFetcher>,
    store: CacheStore,
    timeout: Duration,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
  ) -> Self {
    Self {
      key: key.into(),
      fetcher,
      store,
      timeout,
      outcomes,
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  /// Fetch, cache and report. Returns whether the fetch succeeded.
  pub async fn run(&self, mode: FetchMode) -> bool {
    debug!(key = %self.key, ?mode, "fetching resource");

    let previous = self.store.read(&self.key).map(|entry| entry.payload);
    let result =
      match tokio::time::timeout(self.timeout, self.fetcher.fetch_all(previous.as_ref())).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
          after: self.timeout,
        }),
      };

    match result {
      Ok(snapshot) => {
        // The outcome is sent under the store's write lock, so the binding
        // sees outcomes in the same order the cache saw the writes.
        self
          .store
          .write_and(&self.key, snapshot, |entry| self.publish(mode, Ok(entry)));
        true
      }
      Err(e) => {
        debug!(key = %self.key, ?mode, error = %e, "fetch failed");
        self.publish(mode, Err(e));
        false
      }
    }
  }

  fn publish(&self, mode: FetchMode, result: Result<CacheEntry, FetchError>) {
    if self.outcomes.send(FetchOutcome { mode, result }).is_err() {
      debug!(key = %self.key, "binding unmounted, discarding fetch outcome");
    }
  }
}
