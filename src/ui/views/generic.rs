use crate::notify::NotificationQueue;
use crate::resource::ResourceBinding;
use crate::ui::renderfns::truncate;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;

use super::page::Page;

/// Config-defined resource rendered section by section
pub struct GenericView {
  page: Page<Value>,
  scroll: u16,
}

impl GenericView {
  pub fn new(binding: ResourceBinding, title: &str) -> Self {
    Self {
      page: Page::new(binding, title),
      scroll: 0,
    }
  }
}

/// One-line summary of a section value
fn summarize(value: &Value) -> String {
  match value {
    Value::Null => "unavailable".to_string(),
    Value::Array(items) => format!("{} items", items.len()),
    Value::Object(fields) => format!("{} fields", fields.len()),
    Value::String(s) => truncate(s, 80),
    other => other.to_string(),
  }
}

fn section_lines(data: &Value) -> Vec<Line<'static>> {
  let Some(sections) = data.as_object() else {
    return vec![Line::raw(data.to_string())];
  };

  let mut lines = Vec::new();
  for (name, value) in sections {
    lines.push(Line::from(vec![
      Span::styled(name.clone(), Style::default().fg(Color::Cyan).bold()),
      Span::styled(
        format!("  {}", summarize(value)),
        Style::default().fg(Color::DarkGray),
      ),
    ]));
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    lines.extend(pretty.lines().map(|l| Line::raw(format!("  {}", l))));
    lines.push(Line::default());
  }
  lines
}

impl View for GenericView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
      KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
      KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
      KeyCode::Char('r') => self.page.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.page.block_title(None))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = match (self.page.placeholder(), self.page.data()) {
      (None, Some(data)) => Paragraph::new(section_lines(data)).scroll((self.scroll, 0)),
      (text, _) => Paragraph::new(text.unwrap_or_default())
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true }),
    };
    frame.render_widget(paragraph.block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    self.page.title().to_string()
  }

  fn tick(&mut self, notifications: &mut NotificationQueue) -> bool {
    self.page.tick(notifications)
  }

  fn status(&self) -> Option<String> {
    self.page.status()
  }
}
