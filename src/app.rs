use crate::commands::command_list;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::notify::{NotificationKind, NotificationQueue};
use crate::resources::Resources;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::open_page;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(200);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command_input: CommandInput,

  notifications: NotificationQueue,

  resources: Resources,

  title: String,

  api_url: String,

  should_quit: bool,
}

impl App {
  /// Build the app and mount the initial page. Must be called inside a tokio
  /// runtime.
  pub fn new(config: &Config, resources: Resources, page: Option<&str>) -> Self {
    let mut app = Self {
      view_stack: Vec::new(),
      command_input: CommandInput::new(command_list(resources.defs())),
      notifications: NotificationQueue::new(config.notifications.ttl()),
      resources,
      title: config
        .title
        .clone()
        .unwrap_or_else(|| "agency-dash".to_string()),
      api_url: config.api.url.clone(),
      should_quit: false,
    };

    let requested = page.or(config.default_page.as_deref()).unwrap_or("hosting");
    if !app.open_root(requested) {
      app.notifications.push(
        format!("Unknown page '{}', showing hosting", requested),
        NotificationKind::Warning,
      );
      app.open_root("hosting");
    }
    app
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit() {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    info!("shutting down");
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
    }
  }

  /// Apply finished fetches on every mounted page and drop expired
  /// notifications.
  pub fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick(&mut self.notifications);
    }
    self.notifications.expire(Instant::now());
  }

  pub fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command_input.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let capturing = self.current_view().is_some_and(|v| v.captures_input());
    if !capturing && key.code == KeyCode::Char('x') {
      self.dismiss_latest();
      return;
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => {
        debug!(page = %next.breadcrumb_label(), "push view");
        self.view_stack.push(next);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          // Dropping the view unmounts its bindings
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn dismiss_latest(&mut self) {
    if let Some(id) = self.notifications.latest().map(|n| n.id) {
      self.notifications.dismiss(id);
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    match cmd {
      "" => {}
      "quit" => self.should_quit = true,
      name => {
        if !self.open_root(name) {
          self
            .notifications
            .push(format!("Unknown command: {}", name), NotificationKind::Warning);
        }
      }
    }
  }

  /// Replace the whole stack with the page for `name`.
  fn open_root(&mut self, name: &str) -> bool {
    let Some(def) = self.resources.find(name).cloned() else {
      return false;
    };
    info!(page = %def.name, "open page");
    // Unmount the old pages before mounting the new one
    self.view_stack.clear();
    self.view_stack.push(open_page(&self.resources, &def));
    true
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn notifications(&self) -> &NotificationQueue {
    &self.notifications
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}
