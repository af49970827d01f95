pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use components::draw_toasts;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header};
use view::ShortcutInfo;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, content, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let shortcuts = if app.command_input().is_active() {
    palette_shortcuts()
  } else {
    app
      .current_view()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  };
  draw_header(frame, header, app.title(), app.api_url(), &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, content);
  }

  let status = app.current_view().and_then(|v| v.status());
  draw_footer(frame, footer, &app.breadcrumb(), status.as_deref());

  app.command_input().render_overlay(frame, content);
  draw_toasts(frame, content, app.notifications());
}

/// Header hints while the `:` palette is open
fn palette_shortcuts() -> Vec<ShortcutInfo> {
  vec![
    ShortcutInfo::new("enter", "run").with_priority(10),
    ShortcutInfo::new("tab", "next").with_priority(20),
    ShortcutInfo::new("esc", "cancel").with_priority(30),
  ]
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    Some(_) => {}
    None => state.select(Some(0)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_palette_shortcuts() {
    let keys: Vec<&str> = palette_shortcuts().iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["enter", "tab", "esc"]);
  }

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
