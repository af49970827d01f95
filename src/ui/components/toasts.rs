use crate::notify::{Notification, NotificationKind, NotificationQueue};
use chrono::{DateTime, Local};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

const TOAST_WIDTH: u16 = 48;
const MAX_VISIBLE: usize = 4;

fn kind_style(kind: NotificationKind) -> (Color, &'static str) {
  match kind {
    NotificationKind::Success => (Color::Green, " ok "),
    NotificationKind::Error => (Color::Red, " error "),
    NotificationKind::Info => (Color::Cyan, " info "),
    NotificationKind::Warning => (Color::Yellow, " warning "),
  }
}

/// Block title: kind label plus the local time the notification was raised
fn toast_title(label: &str, created_at_epoch_ms: i64) -> String {
  match DateTime::from_timestamp_millis(created_at_epoch_ms) {
    Some(ts) => format!("{}{} ", label, ts.with_timezone(&Local).format("%H:%M:%S")),
    None => label.to_string(),
  }
}

/// Stack the newest notifications in the bottom-right corner of `area`,
/// newest at the bottom.
pub fn draw_toasts(frame: &mut Frame, area: Rect, queue: &NotificationQueue) {
  let visible: Vec<&Notification> = queue
    .iter()
    .skip(queue.len().saturating_sub(MAX_VISIBLE))
    .collect();

  let width = TOAST_WIDTH.min(area.width);
  if width < 4 {
    return;
  }
  let x = area.right().saturating_sub(width + 1).max(area.x);
  let mut bottom = area.bottom();

  for notification in visible.iter().rev() {
    let (color, label) = kind_style(notification.kind);
    let height = toast_height(&notification.message, width);
    if bottom < area.y + height {
      break;
    }
    bottom -= height;

    let toast_area = Rect::new(x, bottom, width, height);
    frame.render_widget(Clear, toast_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
      .title(Span::styled(
        toast_title(label, notification.created_at_epoch_ms),
        Style::default().fg(color).bold(),
      ));
    let paragraph = Paragraph::new(notification.message.as_str())
      .block(block)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, toast_area);
  }
}

/// Bordered height for a message wrapped to `width`, capped at three lines
fn toast_height(message: &str, width: u16) -> u16 {
  let inner = width.saturating_sub(2).max(1) as usize;
  let lines = message.chars().count().div_ceil(inner).clamp(1, 3);
  lines as u16 + 2
}
