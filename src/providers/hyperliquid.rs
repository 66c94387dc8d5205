// src/providers/hyperliquid.rs
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{PositionSource, ProviderError, VaultSource};
use crate::config::{ms, ServiceConfig};
use crate::types::{RawPositionSnapshot, RawVaultEntry};

pub const DEFAULT_INFO_URL: &str = "https://api.hyperliquid.xyz/info";
pub const DEFAULT_VAULTS_URL: &str = "https://stats-data.hyperliquid.xyz/Mainnet/vaults";

/// Where the two read-only feeds live. Swapped for a mock server in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub info_url: String,
    pub vaults_url: String,
}

/// Unauthenticated JSON-over-HTTPS client for the venue's info and stats feeds.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    pub http: reqwest::Client,
    pub endpoints: Endpoints,
}

impl HyperliquidClient {
    pub fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Build from config. Without `request_timeout_ms` the reqwest default applies.
    pub fn from_config(cfg: &ServiceConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder().gzip(true);
        if let Some(t) = cfg.request_timeout_ms {
            builder = builder.timeout(ms(t));
        }
        let endpoints = Endpoints { info_url: cfg.info_url.clone(), vaults_url: cfg.vaults_url.clone() };
        Ok(Self::new(builder.build()?, endpoints))
    }

    async fn read_json<T: DeserializeOwned>(rsp: reqwest::Response) -> Result<T, ProviderError> {
        let status = rsp.status();
        let body = rsp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl PositionSource for HyperliquidClient {
    async fn clearinghouse_state(&self, address: &str) -> Result<RawPositionSnapshot, ProviderError> {
        tracing::debug!(address, url = %self.endpoints.info_url, "POST clearinghouseState");
        let rsp = self
            .http
            .post(&self.endpoints.info_url)
            .json(&json!({ "type": "clearinghouseState", "user": address }))
            .send()
            .await?;
        Self::read_json(rsp).await
    }
}

#[async_trait::async_trait]
impl VaultSource for HyperliquidClient {
    async fn vaults(&self) -> Result<Vec<RawVaultEntry>, ProviderError> {
        tracing::debug!(url = %self.endpoints.vaults_url, "GET vaults");
        let rsp = self.http.get(&self.endpoints.vaults_url).send().await?;
        Self::read_json(rsp).await
    }
}
