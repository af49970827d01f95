//! Transient, self-expiring user notifications.

use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// How long a notification stays on screen unless dismissed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(4);

/// Unique token identifying one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  #[allow(dead_code)]
  Success,
  Error,
  #[allow(dead_code)]
  Info,
  Warning,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub id: NotificationId,
  pub message: String,
  pub kind: NotificationKind,
  pub created_at_epoch_ms: i64,
  expires_at: Instant,
}

/// FIFO of notifications, each removed after a fixed TTL or on dismissal.
///
/// Removal happens in [`NotificationQueue::expire`], which the UI calls on
/// every tick. Duplicates are allowed and keep their insertion order.
#[derive(Debug)]
pub struct NotificationQueue {
  items: VecDeque<Notification>,
  ttl: Duration,
  next_id: u64,
}

impl Default for NotificationQueue {
  fn default() -> Self {
    Self::new(DEFAULT_TTL)
  }
}

impl NotificationQueue {
  pub fn new(ttl: Duration) -> Self {
    Self {
      items: VecDeque::new(),
      ttl,
      next_id: 1,
    }
  }

  /// Append a notification stamped with the current time.
  pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind) -> NotificationId {
    self.push_at(message, kind, Instant::now())
  }

  /// Append a notification created at `now`.
  pub fn push_at(
    &mut self,
    message: impl Into<String>,
    kind: NotificationKind,
    now: Instant,
  ) -> NotificationId {
    let id = NotificationId(self.next_id);
    self.next_id += 1;

    self.items.push_back(Notification {
      id,
      message: message.into(),
      kind,
      created_at_epoch_ms: Utc::now().timestamp_millis(),
      expires_at: now + self.ttl,
    });
    id
  }

  /// Remove a notification immediately. Returns false if it was already gone.
  pub fn dismiss(&mut self, id: NotificationId) -> bool {
    match self.items.iter().position(|n| n.id == id) {
      Some(index) => {
        self.items.remove(index);
        true
      }
      None => false,
    }
  }

  /// Remove every notification whose TTL has elapsed at `now`.
  ///
  /// Returns the ids removed by this call, in insertion order.
  pub fn expire(&mut self, now: Instant) -> Vec<NotificationId> {
    let mut expired = Vec::new();
    self.items.retain(|n| {
      if n.expires_at <= now {
        expired.push(n.id);
        false
      } else {
        true
      }
    });
    expired
  }

  /// Most recently pushed notification still alive.
  pub fn latest(&self) -> Option<&Notification> {
    self.items.back()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Notification> {
    self.items.iter()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_push_keeps_insertion_order() {
    let mut queue = NotificationQueue::default();
    let now = Instant::now();
    queue.push_at("first", NotificationKind::Info, now);
    queue.push_at("second", NotificationKind::Error, now);
    queue.push_at("second", NotificationKind::Error, now);

    let messages: Vec<&str> = queue.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "second"]);
    assert_eq!(queue.latest().unwrap().kind, NotificationKind::Error);
  }

  #[test]
  fn test_ids_are_unique() {
    let mut queue = NotificationQueue::default();
    let a = queue.push("a", NotificationKind::Info);
    let b = queue.push("a", NotificationKind::Info);
    assert_ne!(a, b);
  }

  #[test]
  fn test_expires_exactly_once() {
    let mut queue = NotificationQueue::default();
    let start = Instant::now();
    let id = queue.push_at("saved", NotificationKind::Success, start);

    assert!(queue.expire(start + Duration::from_secs(3)).is_empty());
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.expire(start + DEFAULT_TTL), vec![id]);
    assert!(queue.is_empty());

    assert!(queue.expire(start + Duration::from_secs(60)).is_empty());
  }

  #[test]
  fn test_dismiss_before_expiry_prevents_later_removal() {
    let mut queue = NotificationQueue::default();
    let start = Instant::now();
    let id = queue.push_at("oops", NotificationKind::Error, start);

    assert!(queue.dismiss(id));
    assert!(queue.is_empty());
    assert!(queue.expire(start + Duration::from_secs(10)).is_empty());
  }

  #[test]
  fn test_dismiss_is_idempotent() {
    let mut queue = NotificationQueue::default();
    let id = queue.push("oops", NotificationKind::Error);
    assert!(queue.dismiss(id));
    assert!(!queue.dismiss(id));
  }

  #[test]
  fn test_expire_only_removes_due_items() {
    let mut queue = NotificationQueue::new(Duration::from_secs(4));
    let start = Instant::now();
    let old = queue.push_at("old", NotificationKind::Info, start);
    let new = queue.push_at("new", NotificationKind::Info, start + Duration::from_secs(2));

    assert_eq!(queue.expire(start + Duration::from_secs(5)), vec![old]);
    assert_eq!(queue.latest().unwrap().id, new);
  }
}
