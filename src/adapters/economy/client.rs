//! Economy HTTP Client - Rate-limited Balance API Client
//!
//! Wraps reqwest with a concurrency limit, per-request timeout and
//! retries for the economy engine's JSON API. Implements both the
//! `BalanceSource` and `NameResolver` ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::types::{BalanceResponse, IdentityRecord};
use crate::config::EconomyConfig;
use crate::domain::Identity;
use crate::ports::balance_source::BalanceSource;
use crate::ports::name_resolver::NameResolver;

/// Configuration for the economy HTTP client.
#[derive(Debug, Clone)]
pub struct EconomyClientConfig {
  /// Base URL for the economy API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl From<&EconomyConfig> for EconomyClientConfig {
  fn from(config: &EconomyConfig) -> Self {
    Self {
      base_url: config.base_url.trim_end_matches('/').to_string(),
      timeout: Duration::from_millis(config.timeout_ms),
      max_concurrent: config.max_concurrent,
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// HTTP client for the economy engine.
pub struct HttpEconomyClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: EconomyClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Names seen on the last identity listing.
  directory: RwLock<HashMap<Identity, String>>,
}

impl HttpEconomyClient {
  /// Create a new economy client.
  pub fn new(config: EconomyClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
      directory: RwLock::new(HashMap::new()),
    })
  }

  /// GET a JSON document with retries.
  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let response = self.get_with_retry(path).await?;
    response
      .json::<T>()
      .await
      .with_context(|| format!("Failed to decode response from {path}"))
  }

  /// Execute a GET with concurrency limiting and retries.
  async fn get_with_retry(&self, path: &str) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let url = format!("{}{}", self.config.base_url, path);
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), path, "Retrying request");
        sleep(delay).await;
      }

      match self.http.get(&url).send().await {
        Ok(response) => match response.status() {
          StatusCode::OK => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(path, "Rate limited by economy API, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, path, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Economy API error {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, path, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }

  /// Fetch the identity listing and refresh the name directory.
  async fn refresh_directory(&self) -> Result<Vec<IdentityRecord>> {
    let records: Vec<IdentityRecord> = self.get_json("/identities").await?;

    let mut directory = self.directory.write().await;
    directory.clear();
    for record in &records {
      if let Some(name) = &record.name {
        directory.insert(record.id, name.clone());
      }
    }

    Ok(records)
  }

  /// Check if the economy API is reachable.
  pub async fn health_check(&self) -> bool {
    self.get_with_retry("/identities").await.is_ok()
  }
}

#[async_trait]
impl BalanceSource for HttpEconomyClient {
  async fn get_balance(&self, identity: Identity) -> Result<f64> {
    let response: BalanceResponse = self
      .get_json(&format!("/balances/{identity}"))
      .await
      .with_context(|| format!("Failed to fetch balance for {identity}"))?;
    Ok(response.balance)
  }

  async fn list_known_identities(&self) -> Result<Vec<Identity>> {
    let records = self
      .refresh_directory()
      .await
      .context("Failed to list identities")?;
    Ok(records.into_iter().map(|r| r.id).collect())
  }
}

#[async_trait]
impl NameResolver for HttpEconomyClient {
  async fn resolve_name(&self, identity: Identity) -> Option<String> {
    self.directory.read().await.get(&identity).cloned()
  }

  async fn find_identity(&self, name: &str) -> Option<Identity> {
    if let Some(found) = find_in(&*self.directory.read().await, name) {
      return Some(found);
    }

    // Unknown name: the directory may predate the identity.
    if let Err(e) = self.refresh_directory().await {
      warn!(error = %e, "Failed to refresh identity directory");
      return None;
    }
    find_in(&*self.directory.read().await, name)
  }
}

fn find_in(directory: &HashMap<Identity, String>, name: &str) -> Option<Identity> {
  directory
    .iter()
    .find(|(_, known)| known.eq_ignore_ascii_case(name))
    .map(|(identity, _)| *identity)
}
