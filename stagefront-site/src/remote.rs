//! Client for the store proxy record endpoint

use crate::error::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;
use stagefront_common::api::{AUTH_HEADER, UNAUTHORIZED_MESSAGE};
use stagefront_common::SiteData;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads and writes the remote snapshot through the store proxy
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    endpoint: String,
    sync_key: Option<String>,
}

impl StoreClient {
    pub fn new(endpoint: impl Into<String>, sync_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sync_key: sync_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_sync_key(&self) -> bool {
        self.sync_key.is_some()
    }

    /// Fetch the remote snapshot; `None` when nothing has been stored yet
    pub async fn fetch(&self) -> Result<Option<Value>> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("GET {} returned {}: {}", self.endpoint, status, body)));
        }

        let value: Value = response.json().await?;
        debug!("Fetched remote snapshot from {}", self.endpoint);
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Replace the remote snapshot with `data`
    pub async fn push(&self, data: &SiteData) -> Result<()> {
        let key = self
            .sync_key
            .as_deref()
            .ok_or_else(|| Error::Config("no sync key configured".to_string()))?;

        let body = serde_json::to_string(data)?;
        let response = self
            .client
            .put(&self.endpoint)
            .header(AUTH_HEADER, key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!("Pushed snapshot to {}", self.endpoint);
                Ok(())
            }
            StatusCode::FORBIDDEN => Err(Error::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Http(format!("PUT {} returned {}: {}", self.endpoint, status, body)))
            }
        }
    }
}
