//! Page-level stale-while-revalidate binding.
//!
//! A [`ResourceBinding`] paints from the cache synchronously on mount, then
//! keeps the snapshot fresh in the background:
//!
//! ```ignore
//! let mut hosting = ResourceBinding::mount(store, fetcher, &policy);
//!
//! // In event loop tick
//! if hosting.poll(&mut notifications) {
//!     // Snapshot or loading state changed, trigger re-render
//! }
//!
//! // In render
//! match hosting.snapshot() {
//!     Some(entry) => render_data(&entry.payload),
//!     None if hosting.is_loading() => render_spinner(),
//!     None => render_retry_hint(),
//! }
//! ```

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::FetchError;
use super::fetcher::{FetchMode, FetchOutcome, FetchRunner, ResourceFetcher};
use super::scheduler::{PollingSession, ResourcePolicy};
use crate::cache::{CacheEntry, CacheStore};
use crate::notify::{NotificationKind, NotificationQueue};

/// Lifecycle of one mounted binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
  /// No cached data; the first foreground fetch is in flight
  ColdStart,
  /// A snapshot is on screen (possibly stale)
  Loaded,
  /// Nothing has ever loaded and the last foreground fetch failed
  ErrorVisible,
  /// Unmounted; no further effects
  Terminal,
}

/// Cached, polled view of one resource.
pub struct ResourceBinding {
  key: String,
  state: BindingState,
  snapshot: Option<CacheEntry>,
  error: Option<FetchError>,
  /// Foreground fetches issued but not yet applied
  foreground_in_flight: usize,
  runner: FetchRunner,
  outcomes: Option<mpsc::UnboundedReceiver<FetchOutcome>>,
  session: Option<PollingSession>,
}

impl ResourceBinding {
  /// Mount a binding: read the cache, start the first fetch and the polling
  /// timer. Must be called inside a tokio runtime.
  pub fn mount(
    store: CacheStore,
    fetcher: Arc<dyn ResourceFetcher>,
    policy: &ResourcePolicy,
  ) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = FetchRunner::new(policy.key.clone(), fetcher, store.clone(), policy.timeout, tx);

    let cached = store.read(&policy.key);
    let warm = cached.is_some();

    let mut binding = Self {
      key: policy.key.clone(),
      state: if warm {
        BindingState::Loaded
      } else {
        BindingState::ColdStart
      },
      snapshot: cached,
      error: None,
      foreground_in_flight: 0,
      runner,
      outcomes: Some(rx),
      session: None,
    };

    if !warm {
      binding.spawn_foreground();
    }
    binding.session = Some(PollingSession::start(
      binding.runner.clone(),
      policy,
      warm,
    ));

    info!(key = %binding.key, warm, interval = ?policy.interval, "resource mounted");
    binding
  }

  pub fn state(&self) -> BindingState {
    self.state
  }

  /// Currently displayed snapshot, if any has ever loaded.
  pub fn snapshot(&self) -> Option<&CacheEntry> {
    self.snapshot.as_ref()
  }

  /// Decode the current snapshot into a typed page model.
  pub fn snapshot_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
    self.snapshot.as_ref().map(|entry| entry.decode())
  }

  /// True while a foreground fetch is outstanding.
  pub fn is_loading(&self) -> bool {
    self.state != BindingState::Terminal && self.foreground_in_flight > 0
  }

  /// Most recent failure, cleared by the next success.
  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }

  /// Manual refresh: always issues a foreground fetch, even if others are in
  /// flight.
  pub fn refresh(&mut self) {
    if self.state == BindingState::Terminal {
      return;
    }
    debug!(key = %self.key, "manual refresh");
    self.spawn_foreground();
  }

  /// Apply every completed fetch, in completion order.
  ///
  /// Returns `true` if anything changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self, notifications: &mut NotificationQueue) -> bool {
    let Some(receiver) = self.outcomes.as_mut() else {
      return false;
    };

    let mut completed = Vec::new();
    while let Ok(outcome) = receiver.try_recv() {
      completed.push(outcome);
    }

    let changed = !completed.is_empty();
    for outcome in completed {
      self.apply(outcome, notifications);
    }
    changed
  }

  /// Tear down: cancel the timer and stop accepting outcomes. Idempotent.
  pub fn unmount(&mut self) {
    if self.state == BindingState::Terminal {
      return;
    }
    if let Some(mut session) = self.session.take() {
      session.cancel();
    }
    self.outcomes = None;
    self.state = BindingState::Terminal;
    info!(key = %self.key, "resource unmounted");
  }

  fn spawn_foreground(&mut self) {
    self.foreground_in_flight += 1;
    let runner = self.runner.clone();
    tokio::spawn(async move {
      runner.run(FetchMode::Foreground).await;
    });
  }

  fn apply(&mut self, outcome: FetchOutcome, notifications: &mut NotificationQueue) {
    if outcome.mode.shows_loading() {
      self.foreground_in_flight = self.foreground_in_flight.saturating_sub(1);
    }

    match outcome.result {
      Ok(entry) => {
        debug!(key = %self.key, mode = ?outcome.mode, "snapshot replaced");
        self.snapshot = Some(entry);
        self.error = None;
        self.state = BindingState::Loaded;
      }
      Err(error) => {
        if outcome.mode.notifies_failure() {
          notifications.push(
            format!("Failed to load {}: {}", self.key, error),
            NotificationKind::Error,
          );
        } else {
          warn!(key = %self.key, error = %error, "background refresh failed, keeping stale data");
        }

        if self.snapshot.is_none() && outcome.mode.shows_loading() {
          self.state = BindingState::ErrorVisible;
        }
        self.error = Some(error);
      }
    }
  }
}

impl Drop for ResourceBinding {
  fn drop(&mut self) {
    self.unmount();
  }
}

impl std::fmt::Debug for ResourceBinding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResourceBinding")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("foreground_in_flight", &self.foreground_in_flight)
      .field(
        "polling",
        &self.session.as_ref().is_some_and(PollingSession::is_active),
      )
      .field("error", &self.error)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::resource::testing::ScriptedFetcher;
  use chrono::Utc;
  use serde_json::json;
  use std::time::Duration;

  fn policy(key: &str, interval_secs: u64) -> ResourcePolicy {
    ResourcePolicy::new(key, Duration::from_secs(interval_secs))
  }

  fn store() -> CacheStore {
    CacheStore::new(MemoryStorage::new())
  }

  async fn settle(binding: &mut ResourceBinding, queue: &mut NotificationQueue, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    binding.poll(queue);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cold_start_loads_and_caches() {
    let store = store();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::ok_after(
      Duration::from_millis(300),
      json!({ "servers": ["a"] }),
    )]));
    let mut queue = NotificationQueue::default();
    let mounted_at = Utc::now().timestamp_millis();

    let mut binding = ResourceBinding::mount(store.clone(), fetcher.clone(), &policy("hosting", 60));
    assert_eq!(binding.state(), BindingState::ColdStart);
    assert!(binding.is_loading());
    assert!(binding.snapshot().is_none());

    settle(&mut binding, &mut queue, 400).await;
    assert_eq!(binding.state(), BindingState::Loaded);
    assert!(!binding.is_loading());
    assert_eq!(fetcher.calls(), 1);

    let shown = binding.snapshot().unwrap().clone();
    assert_eq!(shown.payload, json!({ "servers": ["a"] }));
    let cached = store.read("hosting").unwrap();
    assert_eq!(cached, shown);
    assert!(cached.saved_at_epoch_ms >= mounted_at);
    assert!(queue.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_cold_start_failure_shows_error() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::fail()]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store(), fetcher, &policy("hosting", 60));
    settle(&mut binding, &mut queue, 10).await;

    assert_eq!(binding.state(), BindingState::ErrorVisible);
    assert!(!binding.is_loading());
    assert!(binding.error().is_some());
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.latest().unwrap().kind, NotificationKind::Error);
  }

  /// Single-slot storage that starts out holding an undecodable envelope.
  struct CorruptStorage {
    raw: std::sync::Mutex<String>,
  }

  impl crate::cache::CacheStorage for CorruptStorage {
    fn get(&self, _key: &str) -> color_eyre::Result<Option<String>> {
      Ok(Some(self.raw.lock().unwrap().clone()))
    }

    fn set(&self, _key: &str, value: &str) -> color_eyre::Result<()> {
      *self.raw.lock().unwrap() = value.to_string();
      Ok(())
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_corrupt_cache_mounts_cold() {
    let store = CacheStore::new(CorruptStorage {
      raw: std::sync::Mutex::new("{\"data\": [1, 2".to_string()),
    });
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::ok(
      json!({ "servers": ["fresh"] }),
    )]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store.clone(), fetcher.clone(), &policy("hosting", 60));
    assert_eq!(binding.state(), BindingState::ColdStart);
    assert!(binding.is_loading());
    assert!(binding.snapshot().is_none());

    settle(&mut binding, &mut queue, 10).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(binding.state(), BindingState::Loaded);
    assert_eq!(
      binding.snapshot().unwrap().payload,
      json!({ "servers": ["fresh"] })
    );
    assert_eq!(
      store.read("hosting").unwrap().payload,
      json!({ "servers": ["fresh"] })
    );
    assert!(queue.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_warm_start_paints_cached_snapshot_before_network() {
    let store = store();
    let cached = store.write("hosting", json!({ "servers": ["A", "B"] }));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::ok_after(
      Duration::from_secs(1),
      json!({ "servers": ["C"] }),
    )]));

    let binding = ResourceBinding::mount(store, fetcher.clone(), &policy("hosting", 60));
    assert_eq!(binding.state(), BindingState::Loaded);
    assert!(!binding.is_loading());
    assert_eq!(binding.snapshot(), Some(&cached));
    assert_eq!(fetcher.calls(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_warm_start_revalidates_in_place() {
    let store = store();
    store.write("hosting", json!({ "servers": ["A", "B"] }));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::ok(
      json!({ "servers": ["A", "B", "C"] }),
    )]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store, fetcher, &policy("hosting", 60));
    settle(&mut binding, &mut queue, 150).await;

    assert_eq!(binding.state(), BindingState::Loaded);
    assert_eq!(
      binding.snapshot().unwrap().payload,
      json!({ "servers": ["A", "B", "C"] })
    );
    assert!(!binding.is_loading());
  }

  #[tokio::test(start_paused = true)]
  async fn test_warm_start_with_failed_revalidation_keeps_stale_data() {
    let store = store();
    let cached = store.write("hosting", json!({ "servers": ["A", "B"] }));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::fail()]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store.clone(), fetcher.clone(), &policy("hosting", 60));
    settle(&mut binding, &mut queue, 150).await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(binding.state(), BindingState::Loaded);
    assert_eq!(binding.snapshot(), Some(&cached));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.latest().unwrap().kind, NotificationKind::Error);
    assert_eq!(
      store.read("hosting").unwrap().saved_at_epoch_ms,
      cached.saved_at_epoch_ms
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_background_failure_is_silent() {
    let store = store();
    let cached = store.write("chats", json!({ "chats": [1] }));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
      ScriptedFetcher::ok(json!({ "chats": [1] })),
      ScriptedFetcher::fail(),
    ]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store, fetcher.clone(), &policy("chats", 30));
    settle(&mut binding, &mut queue, 150).await;
    let revalidated = binding.snapshot().unwrap().clone();
    assert!(revalidated.saved_at_epoch_ms >= cached.saved_at_epoch_ms);

    settle(&mut binding, &mut queue, 30_000).await;
    assert_eq!(fetcher.calls(), 2);
    assert!(queue.is_empty());
    assert!(binding.error().is_some());
    assert_eq!(binding.snapshot(), Some(&revalidated));
    assert_eq!(binding.state(), BindingState::Loaded);
  }

  #[tokio::test(start_paused = true)]
  async fn test_manual_refresh_always_fetches() {
    let store = store();
    store.write("hosting", json!(1));
    let fetcher = Arc::new(ScriptedFetcher::repeating_after(
      Duration::from_millis(500),
      json!(2),
    ));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store, fetcher.clone(), &policy("hosting", 60));
    binding.refresh();
    binding.refresh();
    assert!(binding.is_loading());

    settle(&mut binding, &mut queue, 50).await;
    assert_eq!(fetcher.calls(), 2);

    // The post-mount revalidation starts at 100ms
    settle(&mut binding, &mut queue, 1_000).await;
    assert_eq!(fetcher.calls(), 3);
    assert!(!binding.is_loading());
    assert_eq!(binding.snapshot().unwrap().payload, json!(2));
  }

  #[tokio::test(start_paused = true)]
  async fn test_later_completion_wins() {
    let store = store();
    store.write("hosting", json!("cached"));
    // First call is the silent revalidation (issued at 100ms, resolves at 800ms),
    // second is the manual refresh (issued at 200ms, resolves at 700ms).
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
      ScriptedFetcher::ok_after(Duration::from_millis(700), json!("Y")),
      ScriptedFetcher::ok_after(Duration::from_millis(500), json!("X")),
    ]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store.clone(), fetcher.clone(), &policy("hosting", 60));
    tokio::time::sleep(Duration::from_millis(200)).await;
    binding.refresh();

    settle(&mut binding, &mut queue, 550).await;
    assert_eq!(binding.snapshot().unwrap().payload, json!("X"));

    settle(&mut binding, &mut queue, 100).await;
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(binding.snapshot().unwrap().payload, json!("Y"));
    assert_eq!(store.read("hosting").unwrap().payload, json!("Y"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_unmount_stops_fetching() {
    let store = store();
    store.write("chat:7", json!([]));
    let fetcher = Arc::new(ScriptedFetcher::repeating(json!([])));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store, fetcher.clone(), &policy("chat:7", 5));
    settle(&mut binding, &mut queue, 11_000).await;
    let calls = fetcher.calls();
    assert!(calls >= 2);

    binding.unmount();
    assert_eq!(binding.state(), BindingState::Terminal);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.calls(), calls);

    binding.refresh();
    assert!(!binding.poll(&mut queue));
    assert_eq!(fetcher.calls(), calls);
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropping_binding_stops_fetching() {
    let store = store();
    store.write("avito-chats", json!([]));
    let fetcher = Arc::new(ScriptedFetcher::repeating(json!([])));

    let binding = ResourceBinding::mount(store, fetcher.clone(), &policy("avito-chats", 30));
    tokio::time::sleep(Duration::from_millis(150)).await;
    drop(binding);
    let calls = fetcher.calls();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), calls);
  }

  #[tokio::test(start_paused = true)]
  async fn test_late_response_after_unmount_is_discarded() {
    let store = store();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::ok_after(
      Duration::from_secs(2),
      json!("late"),
    )]));
    let mut queue = NotificationQueue::default();

    let mut binding = ResourceBinding::mount(store.clone(), fetcher, &policy("hosting", 60));
    binding.unmount();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!binding.poll(&mut queue));
    assert!(binding.snapshot().is_none());
    assert!(queue.is_empty());
    // The completed fetch still refreshed the shared cache
    assert_eq!(store.read("hosting").unwrap().payload, json!("late"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_as_typed() {
    #[derive(serde::Deserialize)]
    struct Hosting {
      servers: Vec<String>,
    }

    let store = store();
    store.write("hosting", json!({ "servers": ["A"] }));
    let binding = ResourceBinding::mount(
      store,
      Arc::new(ScriptedFetcher::repeating(json!({}))),
      &policy("hosting", 60),
    );

    let hosting: Hosting = binding.snapshot_as().unwrap().unwrap();
    assert_eq!(hosting.servers, vec!["A"]);
  }
}
