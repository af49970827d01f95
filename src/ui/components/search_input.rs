use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search query changed (emitted on each keystroke, empty string on cancel)
  Changed(String),
  /// Search submitted (overlay closed, filter persists)
  Submitted,
}

/// `/` filter box for list pages
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn query(&self) -> &str {
    self.input.value()
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
  }

  /// Case-insensitive match of the current query against any of `fields`.
  /// An empty query matches everything.
  pub fn matches<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let query = self.input.value().trim().to_lowercase();
    query.is_empty()
      || fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&query))
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    // If not active, check for activation key
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    // Active - delegate to TextInput
    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => {
        KeyResult::Event(SearchEvent::Changed(self.input.value().to_string()))
      }
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    // Calculate overlay dimensions - one input line, no suggestions
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);

    // Position at top-left of content area with small margin
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3).intersection(area);

    // Clear the area behind the overlay
    frame.render_widget(Clear, overlay_area);

    // Draw the border/block
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Filter ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    // Draw input line
    let input_line = self.input.line("/");
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_typing_emits_changes() {
    let mut search = SearchInput::new();
    assert_eq!(search.handle_key(key(KeyCode::Char('/'))), KeyResult::Handled);
    assert_eq!(
      search.handle_key(key(KeyCode::Char('и'))),
      KeyResult::Event(SearchEvent::Changed("и".to_string()))
    );
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Submitted)
    );
    assert!(!search.is_active());
    assert_eq!(search.query(), "и");
  }

  #[test]
  fn test_cancel_clears_filter() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('x')));
    assert_eq!(
      search.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(SearchEvent::Changed(String::new()))
    );
    assert_eq!(search.query(), "");
  }

  #[test]
  fn test_matches_is_case_insensitive() {
    let mut search = SearchInput::new();
    assert!(search.matches(["anything"]));

    search.handle_key(key(KeyCode::Char('/')));
    for c in "ИВАН".chars() {
      search.handle_key(key(KeyCode::Char(c)));
    }
    assert!(search.matches(["Клиент", "Иван Петров"]));
    assert!(!search.matches(["Мария"]));
  }

  #[test]
  fn test_overlay_renders_only_while_active() {
    let mut search = SearchInput::new();
    let screen = |search: &SearchInput| {
      let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(60, 6)).unwrap();
      terminal
        .draw(|frame| {
          let area = frame.area();
          search.render_overlay(frame, area);
        })
        .unwrap();
      let buffer = terminal.backend().buffer().clone();
      buffer.content().iter().map(|cell| cell.symbol()).collect::<String>()
    };

    assert!(!screen(&search).contains("Filter"));

    for c in "/web".chars() {
      search.handle_key(key(KeyCode::Char(c)));
    }
    let text = screen(&search);
    assert!(text.contains("Filter"));
    assert!(text.contains("/web"));
  }
}
