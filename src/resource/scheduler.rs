//! Periodic background revalidation bound to one mounted binding.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::fetcher::{FetchMode, FetchRunner};

/// Delay between a warm mount and its first silent revalidation.
pub const DEFAULT_REVALIDATE_DELAY: Duration = Duration::from_millis(100);

/// Per-request timeout applied to every fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-resource polling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePolicy {
  /// Cache key of the resource
  pub key: String,
  /// Time between the end of one background fetch and the start of the next
  pub interval: Duration,
  /// Delay before the silent revalidation after a warm mount
  pub revalidate_delay: Duration,
  /// Per-request timeout
  pub timeout: Duration,
  /// Upper bound for the wait after consecutive failures; `None` keeps the
  /// interval fixed regardless of failures
  pub max_backoff: Option<Duration>,
}

impl ResourcePolicy {
  pub fn new(key: impl Into<String>, interval: Duration) -> Self {
    Self {
      key: key.into(),
      interval,
      revalidate_delay: DEFAULT_REVALIDATE_DELAY,
      timeout: DEFAULT_TIMEOUT,
      max_backoff: None,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_revalidate_delay(mut self, delay: Duration) -> Self {
    self.revalidate_delay = delay;
    self
  }

  pub fn with_max_backoff(mut self, max_backoff: Option<Duration>) -> Self {
    self.max_backoff = max_backoff;
    self
  }

  /// Wait before the next background fetch, given the last wait and whether
  /// the last fetch succeeded.
  pub fn next_wait(&self, last_wait: Duration, succeeded: bool) -> Duration {
    match self.max_backoff {
      Some(max) if !succeeded => last_wait.saturating_mul(2).min(max).max(self.interval),
      _ => self.interval,
    }
  }
}

/// Live polling timer owned by one binding.
///
/// The timer task is aborted on [`PollingSession::cancel`] and on drop. Fetches
/// already dispatched run to completion on their own; their outcomes are
/// discarded by the runner once the binding is gone.
#[derive(Debug)]
pub struct PollingSession {
  handle: Option<JoinHandle<()>>,
}

impl PollingSession {
  /// Start polling.
  ///
  /// `warm` sessions first run one `Revalidate` fetch after the policy's
  /// revalidate delay. Cold sessions rely on the binding's foreground fetch
  /// and only start the interval loop.
  pub fn start(runner: FetchRunner, policy: &ResourcePolicy, warm: bool) -> Self {
    let policy = policy.clone();

    let handle = tokio::spawn(async move {
      if warm {
        tokio::time::sleep(policy.revalidate_delay).await;
        dispatch(&runner, FetchMode::Revalidate).await;
      }

      let mut wait = policy.interval;
      loop {
        tokio::time::sleep(wait).await;
        // Awaiting here means a new background fetch is never issued while
        // the previous one is still in flight.
        let succeeded = dispatch(&runner, FetchMode::Background).await;
        wait = policy.next_wait(wait, succeeded);
        trace!(key = %runner.key(), ?wait, "next background refresh scheduled");
      }
    });

    Self {
      handle: Some(handle),
    }
  }

  pub fn is_active(&self) -> bool {
    self.handle.as_ref().is_some_and(|h| !h.is_finished())
  }

  /// Stop the timer. Idempotent.
  pub fn cancel(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
      debug!("polling session cancelled");
    }
  }
}

impl Drop for PollingSession {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// Run a fetch on its own task so aborting the timer never cuts a request
/// off halfway through its cache write.
async fn dispatch(runner: &FetchRunner, mode: FetchMode) -> bool {
  let runner = runner.clone();
  tokio::spawn(async move { runner.run(mode).await })
    .await
    .unwrap_or(false)
}
