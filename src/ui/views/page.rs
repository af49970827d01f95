//! Shared chrome for resource-backed pages.

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::notify::NotificationQueue;
use crate::resource::{BindingState, ResourceBinding};
use crate::ui::renderfns::format_age;

/// A mounted binding plus its snapshot decoded into the page model.
///
/// Decoding happens once per applied fetch, not per frame.
#[derive(Debug)]
pub struct Page<T> {
  binding: ResourceBinding,
  title: String,
  data: Option<Result<T, String>>,
}

impl<T: DeserializeOwned> Page<T> {
  pub fn new(binding: ResourceBinding, title: impl Into<String>) -> Self {
    let mut page = Self {
      binding,
      title: title.into(),
      data: None,
    };
    page.decode();
    page
  }

  fn decode(&mut self) {
    self.data = self
      .binding
      .snapshot_as::<T>()
      .map(|result| result.map_err(|e| e.to_string()));
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  /// Decoded snapshot, if one has loaded and matches the page model
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref().and_then(|d| d.as_ref().ok())
  }

  pub fn refresh(&mut self) {
    self.binding.refresh();
  }

  pub fn tick(&mut self, notifications: &mut NotificationQueue) -> bool {
    let changed = self.binding.poll(notifications);
    if changed {
      self.decode();
    }
    changed
  }

  /// Block title with count and loading/stale hints
  pub fn block_title(&self, count: Option<usize>) -> String {
    let mut title = match (&self.data, count) {
      (Some(Err(_)), _) => format!(" {} (unexpected data)", self.title),
      (Some(Ok(_)), Some(n)) => format!(" {} ({})", self.title, n),
      (Some(Ok(_)), None) => format!(" {}", self.title),
      (None, _) if self.binding.is_loading() => format!(" {} (loading...)", self.title),
      (None, _) if self.binding.state() == BindingState::ErrorVisible => {
        format!(" {} (error)", self.title)
      }
      (None, _) => format!(" {}", self.title),
    };

    if self.data.is_some() {
      if self.binding.is_loading() {
        title.push_str(" refreshing...");
      } else if self.binding.error().is_some() {
        title.push_str(" [stale]");
      }
    }
    title.push(' ');
    title
  }

  /// Text to show instead of content when there is nothing to render
  pub fn placeholder(&self) -> Option<String> {
    match &self.data {
      Some(Ok(_)) => None,
      Some(Err(e)) => Some(format!("Unexpected response shape: {}", e)),
      None if self.binding.is_loading() => Some("Loading...".to_string()),
      None => match self.binding.error() {
        Some(error) => Some(format!(
          "Failed to load {}: {}\n\nPress 'r' to retry.",
          self.title, error
        )),
        None => Some("No data.".to_string()),
      },
    }
  }

  /// Footer hint with the snapshot age
  pub fn status(&self) -> Option<String> {
    let entry = self.binding.snapshot()?;
    let age = entry.age(Utc::now()).to_std().unwrap_or_default();
    Some(format!("updated {} ago", format_age(age)))
  }
}
