use crate::api::types::{ChatListSnapshot, ChatSummary};
use crate::notify::NotificationQueue;
use crate::resources::{ResourceDef, Resources};
use crate::ui::components::{KeyResult, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_timestamp, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::page::Page;
use super::ChatThreadView;

/// Chat list for the internal messenger or Avito
pub struct ChatListView {
  resources: Resources,
  def: ResourceDef,
  page: Page<ChatListSnapshot>,
  list_state: ListState,
  search: SearchInput,
}

impl ChatListView {
  pub fn new(resources: Resources, def: ResourceDef) -> Self {
    let page = Page::new(resources.bind(&def), def.title.clone());
    Self {
      resources,
      def,
      page,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn visible_chats(&self) -> Vec<&ChatSummary> {
    let Some(data) = self.page.data() else {
      return Vec::new();
    };
    data
      .chats
      .iter()
      .filter(|c| {
        self
          .search
          .matches([c.title.as_str(), c.last_message.as_deref().unwrap_or("")])
      })
      .collect()
  }

  fn open_selected(&self) -> ViewAction {
    let Some(chat) = self
      .list_state
      .selected()
      .and_then(|idx| self.visible_chats().get(idx).copied())
    else {
      return ViewAction::None;
    };

    match self.def.thread_for(&chat.id, &chat.title) {
      Some(thread) => ViewAction::Push(Box::new(ChatThreadView::new(&self.resources, thread))),
      None => ViewAction::None,
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let chats = self.visible_chats();
    let len = chats.len();
    let unread: u32 = chats.iter().map(|c| c.unread_count).sum();

    let mut title = self.page.block_title(Some(len));
    if unread > 0 {
      title = format!("{}[{} unread] ", title, unread);
    }
    if !self.search.query().is_empty() {
      title = format!("{}[/{}] ", title, self.search.query());
    }

    let block = Block::default()
      .title(title)
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

    if chats.is_empty() {
      let content = if self.search.query().is_empty() {
        "No chats."
      } else {
        "No chats match the filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = chats
      .iter()
      .map(|chat| {
        let badge = if chat.unread_count > 0 {
          Span::styled(
            format!("{:>4} ", chat.unread_count),
            Style::default().fg(Color::Black).bg(Color::Yellow).bold(),
          )
        } else {
          Span::raw("     ")
        };
        let title_style = if chat.unread_count > 0 {
          Style::default().fg(Color::White).bold()
        } else {
          Style::default().fg(Color::Cyan)
        };

        ListItem::new(Line::from(vec![
          badge,
          Span::raw(" "),
          Span::styled(format!("{:<28}", truncate(&chat.title, 28)), title_style),
          Span::raw(" "),
          Span::styled(
            format!(
              "{:<12}",
              chat
                .updated_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default()
            ),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(truncate(chat.last_message.as_deref().unwrap_or(""), 60)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    ensure_valid_selection(&mut self.list_state, len);
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for ChatListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Handled | KeyResult::Event(_) => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.page.refresh(),
      KeyCode::Enter => return self.open_selected(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.page.title().to_string()
  }

  fn tick(&mut self, notifications: &mut NotificationQueue) -> bool {
    self.page.tick(notifications)
  }

  fn captures_input(&self) -> bool {
    self.search.is_active()
  }

  fn status(&self) -> Option<String> {
    self.page.status()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(15),
      ShortcutInfo::new("enter", "open").with_priority(18),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("x", "dismiss").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
