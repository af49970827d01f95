//! Page models decoded from cached snapshots.
//!
//! The backend's shapes are loose, so every field is lenient: missing or
//! `null` values decode to defaults and ids may be numbers or strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Merged hosting dataset: `stats`, `servers` and optional `projects`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostingSnapshot {
  #[serde(default, deserialize_with = "null_as_default")]
  pub stats: HostingStats,
  #[serde(default, deserialize_with = "null_as_default")]
  pub servers: Vec<Server>,
  /// `None` when the optional projects section has never loaded
  #[serde(default)]
  pub projects: Option<Vec<ProjectRef>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostingStats {
  #[serde(alias = "totalServers")]
  pub total_servers: u32,
  #[serde(alias = "activeServers")]
  pub active_servers: u32,
  #[serde(alias = "monthlyCost", alias = "total_cost")]
  pub monthly_cost: f64,
  pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Server {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub name: String,
  pub provider: Option<String>,
  pub ip: Option<String>,
  #[serde(alias = "monthlyCost", alias = "price")]
  pub monthly_cost: Option<f64>,
  pub status: Option<String>,
  #[serde(alias = "projectName")]
  pub project: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectRef {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub name: String,
}

/// Chat list dataset (internal chats and Avito messenger)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatListSnapshot {
  #[serde(default, deserialize_with = "null_as_default")]
  pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatSummary {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(alias = "name")]
  pub title: String,
  #[serde(alias = "lastMessage")]
  pub last_message: Option<String>,
  #[serde(alias = "unreadCount", alias = "unread")]
  pub unread_count: u32,
  #[serde(alias = "updatedAt")]
  pub updated_at: Option<String>,
}

/// Messages of one chat thread
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatThreadSnapshot {
  #[serde(default, deserialize_with = "null_as_default")]
  pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(alias = "from", alias = "sender")]
  pub author: Option<String>,
  #[serde(alias = "content", alias = "body")]
  pub text: String,
  #[serde(alias = "createdAt")]
  pub created_at: Option<String>,
  #[serde(alias = "isOutgoing")]
  pub outgoing: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  })
}
