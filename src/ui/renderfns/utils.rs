use chrono::{DateTime, Utc};
use ratatui::prelude::Color;
use std::time::Duration;

/// Truncate to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a server status reported by the backend
pub fn status_color(status: &str) -> Color {
  match status.to_lowercase().as_str() {
    "active" | "running" | "online" | "ok" => Color::Green,
    "pending" | "provisioning" | "maintenance" | "restarting" => Color::Yellow,
    "stopped" | "offline" | "error" | "failed" | "suspended" => Color::Red,
    _ => Color::White,
  }
}

/// Compact age like "45s", "3m", "2h" or "4d"
pub fn format_age(age: Duration) -> String {
  let secs = age.as_secs();
  match secs {
    0..=59 => format!("{}s", secs),
    60..=3599 => format!("{}m", secs / 60),
    3600..=86399 => format!("{}h", secs / 3600),
    _ => format!("{}d", secs / 86400),
  }
}

/// Short local-agnostic timestamp for RFC 3339 strings, or the input as is
pub fn format_timestamp(raw: &str) -> String {
  match raw.parse::<DateTime<Utc>>() {
    Ok(ts) => ts.format("%d.%m %H:%M").to_string(),
    Err(_) => raw.to_string(),
  }
}
