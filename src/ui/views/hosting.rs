use crate::api::types::{HostingSnapshot, Server};
use crate::notify::NotificationQueue;
use crate::resource::ResourceBinding;
use crate::ui::components::{KeyResult, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::page::Page;

/// Servers, monthly costs and linked projects
pub struct HostingView {
  page: Page<HostingSnapshot>,
  list_state: ListState,
  search: SearchInput,
}

impl HostingView {
  pub fn new(binding: ResourceBinding, title: &str) -> Self {
    Self {
      page: Page::new(binding, title),
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn visible_servers(&self) -> Vec<&Server> {
    let Some(data) = self.page.data() else {
      return Vec::new();
    };
    data
      .servers
      .iter()
      .filter(|s| {
        self.search.matches([
          s.name.as_str(),
          s.provider.as_deref().unwrap_or(""),
          s.ip.as_deref().unwrap_or(""),
          s.project.as_deref().unwrap_or(""),
        ])
      })
      .collect()
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect, data: &HostingSnapshot) {
    let stats = &data.stats;
    let currency = stats.currency.as_deref().unwrap_or("");
    let projects = match &data.projects {
      Some(projects) => Span::raw(projects.len().to_string()),
      None => Span::styled("unavailable", Style::default().fg(Color::DarkGray)),
    };

    let line = Line::from(vec![
      Span::styled(" Servers ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        format!("{}/{}", stats.active_servers, stats.total_servers),
        Style::default().fg(Color::Green).bold(),
      ),
      Span::styled("   Monthly ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        format!("{:.2} {}", stats.monthly_cost, currency),
        Style::default().fg(Color::Yellow).bold(),
      ),
      Span::styled("   Projects ", Style::default().fg(Color::DarkGray)),
      projects,
    ]);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(line).block(block), area);
  }

  fn render_servers(&mut self, frame: &mut Frame, area: Rect) {
    let servers = self.visible_servers();
    let len = servers.len();

    let mut title = self.page.block_title(Some(len));
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

    if servers.is_empty() {
      let content = if self.search.query().is_empty() {
        "No servers."
      } else {
        "No servers match the filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = servers
      .iter()
      .map(|server| {
        let status = server.status.as_deref().unwrap_or("-");
        let cost = server
          .monthly_cost
          .map(|c| format!("{:>9.2}", c))
          .unwrap_or_else(|| format!("{:>9}", "-"));

        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<20}", truncate(&server.name, 20)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!(
            "{:<12}",
            truncate(server.provider.as_deref().unwrap_or("-"), 12)
          )),
          Span::raw(" "),
          Span::raw(format!("{:<16}", server.ip.as_deref().unwrap_or("-"))),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", truncate(status, 10)),
            Style::default().fg(status_color(status)),
          ),
          Span::styled(cost, Style::default().fg(Color::Yellow)),
          Span::raw("  "),
          Span::styled(
            truncate(server.project.as_deref().unwrap_or(""), 30),
            Style::default().fg(Color::DarkGray),
          ),
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

impl View for HostingView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Handled | KeyResult::Event(_) => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.page.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [stats_area, list_area] =
      Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

    if let Some(data) = self.page.data() {
      self.render_stats(frame, stats_area, data);
      self.render_servers(frame, list_area);
    } else {
      self.render_servers(frame, area);
    }
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
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("x", "dismiss").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheStore, MemoryStorage};
  use crate::resource::testing::ScriptedFetcher;
  use crate::resource::ResourcePolicy;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn screen(view: &mut HostingView) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
    terminal
      .draw(|frame| {
        let area = frame.area();
        view.render(frame, area);
      })
      .unwrap();
    let buffer = terminal.backend().buffer().clone();
    buffer.content().iter().map(|cell| cell.symbol()).collect()
  }

  fn warm_view() -> HostingView {
    let store = CacheStore::new(MemoryStorage::new());
    store.write(
      "hosting-dashboard",
      json!({
        "stats": { "total_servers": 2, "active_servers": 1, "monthly_cost": 35.5, "currency": "EUR" },
        "servers": [
          { "id": 1, "name": "web-1", "provider": "Hetzner", "status": "active", "monthly_cost": 20.0 },
          { "id": 2, "name": "db-1", "provider": "DigitalOcean", "status": "stopped", "monthly_cost": 15.5 }
        ],
        "projects": null
      }),
    );
    let policy = ResourcePolicy::new("hosting-dashboard", Duration::from_secs(60));
    let fetcher = Arc::new(ScriptedFetcher::repeating_after(
      Duration::from_secs(5),
      json!({}),
    ));
    HostingView::new(ResourceBinding::mount(store, fetcher, &policy), "Hosting")
  }

  #[tokio::test(start_paused = true)]
  async fn test_renders_cached_snapshot_immediately() {
    let mut view = warm_view();
    let text = screen(&mut view);
    assert!(text.contains("web-1"));
    assert!(text.contains("db-1"));
    assert!(text.contains("35.50 EUR"));
    assert!(text.contains("unavailable"));
    assert!(text.contains("Hosting (2)"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_filter_narrows_servers() {
    let mut view = warm_view();
    view.handle_key(key(KeyCode::Char('/')));
    assert!(view.captures_input());
    for c in "hetz".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.captures_input());

    let names: Vec<&str> = view.visible_servers().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["web-1"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_back_pops() {
    let mut view = warm_view();
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop));
    assert!(matches!(view.handle_key(key(KeyCode::Char('r'))), ViewAction::None));
  }
}
