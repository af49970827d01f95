use crate::notify::NotificationQueue;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// A page on the view stack.
///
/// Views own their resource bindings: mounting happens in the constructor,
/// unmounting when the view is dropped off the stack. App → View → Components
/// is the delegation chain for keys.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Apply completed fetches. Returns true if anything changed.
  fn tick(&mut self, _notifications: &mut NotificationQueue) -> bool {
    false
  }

  /// True while a text input inside the view owns the keyboard
  fn captures_input(&self) -> bool {
    false
  }

  /// Short freshness hint for the footer, e.g. "updated 12s ago"
  fn status(&self) -> Option<String> {
    None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("x", "dismiss").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
