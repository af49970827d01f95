use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resource::Section;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API domain if not set)
  pub title: Option<String>,
  /// Page opened on startup (hosting, avito or chats)
  pub default_page: Option<String>,
  #[serde(default)]
  pub notifications: NotificationsConfig,
  /// Per-resource overrides keyed by page name
  #[serde(default)]
  pub resources: BTreeMap<String, ResourceOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  #[serde(default)]
  pub auth: AuthConfig,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  20
}

/// How requests authenticate. Secrets never live in the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
  #[default]
  None,
  /// Bearer token from AGENCY_DASH_API_TOKEN
  Bearer,
  /// Basic auth, password from AGENCY_DASH_API_PASSWORD
  Basic { username: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
  4
}

impl Default for NotificationsConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

impl NotificationsConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

/// Overrides for a built-in resource, or a full definition for a new one.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResourceOverride {
  pub title: Option<String>,
  pub key: Option<String>,
  pub interval_secs: Option<u64>,
  pub revalidate_delay_ms: Option<u64>,
  /// Enables exponential backoff on consecutive failures, capped here
  pub max_backoff_secs: Option<u64>,
  pub sections: Option<Vec<Section>>,
  /// Path template for a chat's messages, `{id}` is replaced
  pub thread_path: Option<String>,
  pub thread_interval_secs: Option<u64>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./agency-dash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/agency-dash/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/agency-dash/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("agency-dash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("agency-dash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than zero"));
    }
    Ok(config)
  }

  /// Get the API bearer token from environment variables.
  ///
  /// Checks AGENCY_DASH_API_TOKEN.
  pub fn get_api_token() -> Result<String> {
    std::env::var("AGENCY_DASH_API_TOKEN").map_err(|_| {
      eyre!("API token not found. Set AGENCY_DASH_API_TOKEN environment variable.")
    })
  }

  /// Get the API basic-auth password from environment variables.
  ///
  /// Checks AGENCY_DASH_API_PASSWORD.
  pub fn get_api_password() -> Result<String> {
    std::env::var("AGENCY_DASH_API_PASSWORD").map_err(|_| {
      eyre!("API password not found. Set AGENCY_DASH_API_PASSWORD environment variable.")
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::resource::Method;

  #[test]
  fn test_minimal_config() {
    let config = Config::from_yaml("api:\n  url: https://crm.example.com/api\n").unwrap();
    assert_eq!(config.api.url, "https://crm.example.com/api");
    assert_eq!(config.api.auth, AuthConfig::None);
    assert_eq!(config.api.timeout_secs, 20);
    assert_eq!(config.notifications.ttl(), Duration::from_secs(4));
    assert!(config.resources.is_empty());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: https://crm.example.com/api
  auth:
    type: basic
    username: admin
  timeout_secs: 15
title: Agency
default_page: avito
notifications:
  ttl_secs: 6
resources:
  hosting:
    interval_secs: 120
    max_backoff_secs: 600
  deals:
    title: Deals
    interval_secs: 45
    sections:
      - name: deals
        path: deals/search
        method: POST
        body: { status: open }
      - name: stages
        path: deals/stages
        optional: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(
      config.api.auth,
      AuthConfig::Basic {
        username: "admin".to_string()
      }
    );
    assert_eq!(config.default_page.as_deref(), Some("avito"));
    assert_eq!(config.notifications.ttl_secs, 6);

    let hosting = &config.resources["hosting"];
    assert_eq!(hosting.interval_secs, Some(120));
    assert_eq!(hosting.max_backoff_secs, Some(600));

    let sections = config.resources["deals"].sections.as_ref().unwrap();
    assert_eq!(sections[0].method, Method::Post);
    assert!(sections[0].body.is_some());
    assert_eq!(sections[1].method, Method::Get);
    assert!(sections[1].optional);
  }

  #[test]
  fn test_bearer_auth() {
    let config =
      Config::from_yaml("api:\n  url: https://x.example\n  auth:\n    type: bearer\n").unwrap();
    assert_eq!(config.api.auth, AuthConfig::Bearer);
  }

  #[test]
  fn test_zero_timeout_rejected() {
    assert!(Config::from_yaml("api:\n  url: https://x.example\n  timeout_secs: 0\n").is_err());
  }

  #[test]
  fn test_example_config_parses() {
    let config = Config::from_yaml(include_str!("../config.example.yaml")).unwrap();
    assert_eq!(config.api.auth, AuthConfig::Bearer);
    assert_eq!(config.resources.len(), 4);
    assert_eq!(
      config.resources["avito"].thread_path.as_deref(),
      Some("avito/chats/{id}/messages")
    );
  }

  #[test]
  fn test_missing_explicit_path() {
    let result = Config::load(Some(Path::new("/nonexistent/agency-dash.yaml")));
    assert!(result.is_err());
  }
}
