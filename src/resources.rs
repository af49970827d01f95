//! Resource definitions for every page and the context that mounts them.

use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cache::CacheStore;
use crate::config::{Config, ResourceOverride};
use crate::resource::{EndpointFetcher, ResourceBinding, ResourcePolicy, Section, SectionSource};

/// How a resource's snapshot is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
  Hosting,
  ChatList,
  ChatThread,
  /// Config-defined resource shown as raw sections
  Generic,
}

/// Messages of one chat, derived from a chat list resource
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadTemplate {
  /// Path with `{id}` placeholder
  pub path: String,
  pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
  /// Command name that opens the page
  pub name: String,
  pub title: String,
  pub kind: PageKind,
  pub policy: ResourcePolicy,
  pub sections: Vec<Section>,
  pub thread: Option<ThreadTemplate>,
}

impl ResourceDef {
  fn new(name: &str, title: &str, kind: PageKind, key: &str, interval_secs: u64) -> Self {
    Self {
      name: name.to_string(),
      title: title.to_string(),
      kind,
      policy: ResourcePolicy::new(key, Duration::from_secs(interval_secs)),
      sections: Vec::new(),
      thread: None,
    }
  }

  fn with_sections(mut self, sections: Vec<Section>) -> Self {
    self.sections = sections;
    self
  }

  fn with_thread(mut self, path: &str, interval_secs: u64) -> Self {
    self.thread = Some(ThreadTemplate {
      path: path.to_string(),
      interval: Duration::from_secs(interval_secs),
    });
    self
  }

  /// Definition for the message thread of one chat of this list.
  ///
  /// The id comes from the server and is percent-encoded as a single path
  /// segment, so it can never point the request at another endpoint.
  pub fn thread_for(&self, chat_id: &str, chat_title: &str) -> Option<ResourceDef> {
    let template = self.thread.as_ref()?;
    let key = format!("{}:{}", self.policy.key, chat_id);
    let segment = encode_path_segment(chat_id)?;

    let mut def = ResourceDef::new(
      &self.name,
      chat_title,
      PageKind::ChatThread,
      &key,
      template.interval.as_secs(),
    )
    .with_sections(vec![Section::get(
      "messages",
      &template.path.replace("{id}", &segment),
    )]);
    def.policy = def
      .policy
      .with_timeout(self.policy.timeout)
      .with_revalidate_delay(self.policy.revalidate_delay)
      .with_max_backoff(self.policy.max_backoff);
    Some(def)
  }

  fn apply(&mut self, o: &ResourceOverride) {
    if let Some(title) = &o.title {
      self.title = title.clone();
    }
    if let Some(key) = &o.key {
      self.policy.key = key.clone();
    }
    if let Some(secs) = o.interval_secs {
      self.policy.interval = Duration::from_secs(secs.max(1));
    }
    if let Some(ms) = o.revalidate_delay_ms {
      self.policy.revalidate_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = o.max_backoff_secs {
      self.policy.max_backoff = Some(Duration::from_secs(secs));
    }
    if let Some(sections) = &o.sections {
      self.sections = sections.clone();
    }
    if let Some(path) = &o.thread_path {
      let interval = self
        .thread
        .as_ref()
        .map(|t| t.interval)
        .unwrap_or(Duration::from_secs(5));
      self.thread = Some(ThreadTemplate {
        path: path.clone(),
        interval,
      });
    }
    if let (Some(thread), Some(secs)) = (self.thread.as_mut(), o.thread_interval_secs) {
      thread.interval = Duration::from_secs(secs.max(1));
    }
  }
}

fn encode_path_segment(raw: &str) -> Option<String> {
  let mut url = Url::parse("http://localhost/").ok()?;
  url.path_segments_mut().ok()?.clear().push(raw);
  Some(url.path().trim_start_matches('/').to_string())
}

/// Pages available without any configuration
pub fn builtin_resources() -> Vec<ResourceDef> {
  vec![
    ResourceDef::new(
      "hosting",
      "Hosting",
      PageKind::Hosting,
      "hosting-dashboard",
      60,
    )
    .with_sections(vec![
      Section::get("stats", "hosting/stats"),
      Section::get("servers", "hosting/servers"),
      Section::get("projects", "projects").optional(),
    ]),
    ResourceDef::new("avito", "Avito", PageKind::ChatList, "avito-chats", 30)
      .with_sections(vec![Section::get("chats", "avito/chats")])
      .with_thread("avito/chats/{id}/messages", 5),
    ResourceDef::new("chats", "Chats", PageKind::ChatList, "chats", 10)
      .with_sections(vec![Section::get("chats", "chats")])
      .with_thread("chats/{id}/messages", 5),
  ]
}

/// Built-in resources with config overrides applied, plus config-only ones.
pub fn resolve_resources(config: &Config) -> Vec<ResourceDef> {
  let timeout = Duration::from_secs(config.api.timeout_secs);
  let mut defs = builtin_resources();

  for (name, o) in &config.resources {
    match defs.iter_mut().find(|d| &d.name == name) {
      Some(def) => def.apply(o),
      None if o.sections.is_some() => {
        let mut def = ResourceDef::new(name, name, PageKind::Generic, name, 60);
        def.apply(o);
        defs.push(def);
      }
      None => tracing::warn!(resource = %name, "override for unknown resource without sections, ignoring"),
    }
  }

  for def in &mut defs {
    def.policy.timeout = timeout;
  }
  defs
}

/// Everything a page needs to mount bindings.
#[derive(Clone)]
pub struct Resources {
  store: CacheStore,
  source: Arc<dyn SectionSource>,
  defs: Arc<Vec<ResourceDef>>,
}

impl Resources {
  pub fn new(config: &Config, store: CacheStore, source: Arc<dyn SectionSource>) -> Self {
    Self {
      store,
      source,
      defs: Arc::new(resolve_resources(config)),
    }
  }

  pub fn find(&self, name: &str) -> Option<&ResourceDef> {
    self.defs.iter().find(|d| d.name == name)
  }

  pub fn defs(&self) -> &[ResourceDef] {
    &self.defs
  }

  /// Mount a binding for a resource.
  pub fn bind(&self, def: &ResourceDef) -> ResourceBinding {
    let fetcher = Arc::new(EndpointFetcher::new(
      self.source.clone(),
      def.sections.clone(),
    ));
    ResourceBinding::mount(self.store.clone(), fetcher, &def.policy)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  //! In-memory backend for page tests.

  use async_trait::async_trait;
  use serde_json::Value;
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};

  use super::Resources;
  use crate::cache::{CacheStore, MemoryStorage};
  use crate::config::Config;
  use crate::resource::{FetchError, Section, SectionSource};

  /// Answers each section path from a fixed table; unknown paths are 404.
  #[derive(Default)]
  pub struct StaticSource {
    routes: HashMap<String, Value>,
    requested: Mutex<Vec<String>>,
  }

  impl StaticSource {
    pub fn new(routes: &[(&str, Value)]) -> Self {
      Self {
        routes: routes
          .iter()
          .map(|(path, body)| (path.to_string(), body.clone()))
          .collect(),
        requested: Mutex::new(Vec::new()),
      }
    }

    pub fn requested(&self) -> Vec<String> {
      self.requested.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl SectionSource for StaticSource {
    async fn request(&self, section: &Section) -> Result<Value, FetchError> {
      self.requested.lock().unwrap().push(section.path.clone());
      self
        .routes
        .get(&section.path)
        .cloned()
        .ok_or_else(|| FetchError::Http {
          endpoint: section.path.clone(),
          status: 404,
        })
    }
  }

  pub fn resources(source: Arc<StaticSource>) -> (Resources, CacheStore) {
    let config = Config::from_yaml("api:\n  url: https://crm.example.com/api\n").unwrap();
    let store = CacheStore::new(MemoryStorage::new());
    (Resources::new(&config, store.clone(), source), store)
  }
}
