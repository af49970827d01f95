mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod logging;
mod notify;
mod resource;
mod resources;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::cache::{CacheStore, MemoryStorage, SqliteStorage};
use crate::resources::Resources;

#[derive(Parser, Debug)]
#[command(name = "agency-dash")]
#[command(about = "A terminal dashboard for the agency CRM, served from cache and refreshed in the background")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/agency-dash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Page to open on startup (hosting, avito, chats or a configured resource)
  #[arg(short, long)]
  page: Option<String>,

  /// Keep the cache in memory only; nothing is read from or written to disk
  #[arg(long)]
  no_cache: bool,

  /// Log file (default: $XDG_DATA_HOME/agency-dash/agency-dash.log)
  #[arg(long)]
  log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(args.log_file.as_deref())?;

  let store = if args.no_cache {
    CacheStore::new(MemoryStorage::new())
  } else {
    CacheStore::new(SqliteStorage::open()?)
  };
  // Separate backends never share snapshots
  let store = store.with_namespace(config.api.url.clone());

  let client = ApiClient::new(&config.api)?;
  tracing::info!(api = client.base_url(), no_cache = args.no_cache, "starting");
  let resources = Resources::new(&config, store, Arc::new(client));

  let mut app = app::App::new(&config, resources, args.page.as_deref());
  app.run().await?;

  Ok(())
}
