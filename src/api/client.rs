use crate::config::{ApiConfig, AuthConfig, Config};
use crate::resource::{FetchError, Method, Section, SectionSource};
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Resolved credentials attached to every request.
#[derive(Clone)]
pub enum Credentials {
  None,
  Bearer(String),
  Basic { username: String, password: String },
}

impl Credentials {
  /// Resolve configured auth against secrets from the environment.
  pub fn resolve(auth: &AuthConfig) -> Result<Self> {
    Ok(match auth {
      AuthConfig::None => Credentials::None,
      AuthConfig::Bearer => Credentials::Bearer(Config::get_api_token()?),
      AuthConfig::Basic { username } => Credentials::Basic {
        username: username.clone(),
        password: Config::get_api_password()?,
      },
    })
  }
}

// Never print secrets
impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Credentials::None => write!(f, "None"),
      Credentials::Bearer(_) => write!(f, "Bearer(***)"),
      Credentials::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
    }
  }
}

/// JSON-over-HTTP client for the agency backend
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  credentials: Credentials,
  timeout: Duration,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let credentials = Credentials::resolve(&config.auth)?;
    Self::with_credentials(config, credentials)
  }

  pub fn with_credentials(config: &ApiConfig, credentials: Credentials) -> Result<Self> {
    let base = parse_base_url(&config.url)?;
    let timeout = Duration::from_secs(config.timeout_secs);

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .gzip(true)
      .user_agent(concat!("agency-dash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      credentials,
      timeout,
    })
  }

  pub fn base_url(&self) -> &str {
    self.base.as_str()
  }

  /// GET a JSON document
  pub async fn get(&self, path: &str) -> Result<Value, FetchError> {
    let url = self.endpoint_url(path)?;
    self.send(self.http.get(url), path).await
  }

  /// POST a JSON body and read a JSON document back
  pub async fn post(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
    let url = self.endpoint_url(path)?;
    self.send(self.http.post(url).json(body), path).await
  }

  async fn send(
    &self,
    request: reqwest::RequestBuilder,
    endpoint: &str,
  ) -> Result<Value, FetchError> {
    let request = match &self.credentials {
      Credentials::None => request,
      Credentials::Bearer(token) => request.bearer_auth(token),
      Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
    };

    let response = request
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await
      .map_err(|e| self.map_error(endpoint, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Http {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
      });
    }

    response
      .json::<Value>()
      .await
      .map_err(|e| self.map_error(endpoint, e))
  }

  fn map_error(&self, endpoint: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
      FetchError::Timeout {
        after: self.timeout,
      }
    } else if e.is_decode() {
      FetchError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
      }
    } else {
      FetchError::Transport {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
      }
    }
  }

  /// Resolve a section path against the base URL
  fn endpoint_url(&self, path: &str) -> Result<Url, FetchError> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| FetchError::Transport {
        endpoint: path.to_string(),
        message: format!("invalid endpoint path: {}", e),
      })
  }
}

#[async_trait]
impl SectionSource for ApiClient {
  async fn request(&self, section: &Section) -> Result<Value, FetchError> {
    match section.method {
      Method::Get => self.get(&section.path).await,
      Method::Post => {
        let body = section.body.clone().unwrap_or(Value::Null);
        self.post(&section.path, &body).await
      }
    }
  }
}

/// Parse the base URL so relative paths append to it instead of replacing
/// its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
  let normalized = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  let url = Url::parse(&normalized).map_err(|e| eyre!("Invalid API url '{}': {}", raw, e))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(eyre!("API url must be http or https: {}", raw));
  }
  Ok(url)
}
