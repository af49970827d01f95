use crate::api::types::{ChatMessage, ChatThreadSnapshot};
use crate::notify::NotificationQueue;
use crate::resources::{ResourceDef, Resources};
use crate::ui::renderfns::format_timestamp;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::page::Page;

/// Messages of one chat, newest at the bottom
pub struct ChatThreadView {
  page: Page<ChatThreadSnapshot>,
  /// Lines scrolled up from the bottom
  scroll_back: u16,
}

impl ChatThreadView {
  pub fn new(resources: &Resources, def: ResourceDef) -> Self {
    Self {
      page: Page::new(resources.bind(&def), def.title),
      scroll_back: 0,
    }
  }

  fn message_lines(messages: &[ChatMessage]) -> Vec<Line<'_>> {
    let mut lines = Vec::with_capacity(messages.len() * 2);
    for message in messages {
      let (author, color) = if message.outgoing {
        ("you", Color::Green)
      } else {
        (message.author.as_deref().unwrap_or("client"), Color::Cyan)
      };

      let mut header = vec![Span::styled(author, Style::default().fg(color).bold())];
      if let Some(ts) = &message.created_at {
        header.push(Span::styled(
          format!("  {}", format_timestamp(ts)),
          Style::default().fg(Color::DarkGray),
        ));
      }
      lines.push(Line::from(header));
      lines.extend(message.text.lines().map(|l| Line::raw(format!("  {}", l))));
      lines.push(Line::default());
    }
    lines
  }
}

impl View for ChatThreadView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('k') | KeyCode::Up => self.scroll_back = self.scroll_back.saturating_add(1),
      KeyCode::Char('j') | KeyCode::Down => self.scroll_back = self.scroll_back.saturating_sub(1),
      KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(10),
      KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(10),
      KeyCode::Char('G') | KeyCode::End => self.scroll_back = 0,
      KeyCode::Char('r') => self.page.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let count = self.page.data().map(|d| d.messages.len());
    let block = Block::default()
      .title(self.page.block_title(count))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(text) = self.page.placeholder() {
      let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let messages = self.page.data().map(|d| d.messages.as_slice()).unwrap_or(&[]);
    if messages.is_empty() {
      let paragraph = Paragraph::new("No messages yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let lines = Self::message_lines(messages);
    let visible = area.height.saturating_sub(2);
    let total = lines.len() as u16;
    let max_back = total.saturating_sub(visible);
    self.scroll_back = self.scroll_back.min(max_back);
    let offset = max_back - self.scroll_back;

    let paragraph = Paragraph::new(lines).block(block).scroll((offset, 0));
    frame.render_widget(paragraph, area);
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

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("j/k", "scroll").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("x", "dismiss").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
