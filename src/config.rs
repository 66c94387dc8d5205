// src/config.rs
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::filter::{VaultFilter, VaultSortKey};
use crate::normalize::DEFAULT_TOP_N;
use crate::providers::hyperliquid::{DEFAULT_INFO_URL, DEFAULT_VAULTS_URL};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "d_info_url")]             pub info_url: String,
    #[serde(default = "d_vaults_url")]           pub vaults_url: String,
    #[serde(default)]                            pub addresses: Vec<String>,
    #[serde(default = "d_positions_poll_ms")]    pub positions_poll_ms: u64,
    #[serde(default = "d_vaults_poll_ms")]       pub vaults_poll_ms: u64,
    #[serde(default = "d_top_n")]                pub vault_top_n: usize,
    #[serde(default)]                            pub request_timeout_ms: Option<u64>,
    #[serde(default)]                            pub show_closed: bool,
    #[serde(default)]                            pub vault_search: Option<String>,
    #[serde(default)]                            pub vault_sort: VaultSortKey,
}
fn d_info_url() -> String { DEFAULT_INFO_URL.into() }
fn d_vaults_url() -> String { DEFAULT_VAULTS_URL.into() }
fn d_positions_poll_ms() -> u64 { 5_000 }
fn d_vaults_poll_ms() -> u64 { 30_000 }
fn d_top_n() -> usize { DEFAULT_TOP_N }
#[inline]
pub fn ms(d: u64) -> std::time::Duration { Duration::from_millis(d) }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            info_url: d_info_url(),
            vaults_url: d_vaults_url(),
            addresses: Vec::new(),
            positions_poll_ms: d_positions_poll_ms(),
            vaults_poll_ms: d_vaults_poll_ms(),
            vault_top_n: d_top_n(),
            request_timeout_ms: None,
            show_closed: false,
            vault_search: None,
            vault_sort: VaultSortKey::Tvl,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply `HYPERVIEW_*` overrides from a key lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HYPERVIEW_INFO_URL") { self.info_url = v; }
        if let Some(v) = lookup("HYPERVIEW_VAULTS_URL") { self.vaults_url = v; }
        if let Some(v) = lookup("HYPERVIEW_ADDRESSES") {
            self.addresses = v.split(',').map(str::trim).filter(|a| !a.is_empty()).map(String::from).collect();
        }
        if let Some(v) = lookup("HYPERVIEW_POSITIONS_POLL_MS") { self.positions_poll_ms = parse_ms("HYPERVIEW_POSITIONS_POLL_MS", &v)?; }
        if let Some(v) = lookup("HYPERVIEW_VAULTS_POLL_MS") { self.vaults_poll_ms = parse_ms("HYPERVIEW_VAULTS_POLL_MS", &v)?; }
        if let Some(v) = lookup("HYPERVIEW_TIMEOUT_MS") { self.request_timeout_ms = Some(parse_ms("HYPERVIEW_TIMEOUT_MS", &v)?); }
        Ok(())
    }

    /// Load `.env` if present, then read overrides from the process environment.
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        self.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addresses.is_empty() {
            return Err(ConfigError::Invalid("no wallet address provided".into()));
        }
        if self.positions_poll_ms == 0 || self.vaults_poll_ms == 0 {
            return Err(ConfigError::Invalid("poll intervals must be non-zero".into()));
        }
        if self.vault_top_n == 0 {
            return Err(ConfigError::Invalid("vault_top_n must be at least 1".into()));
        }
        Ok(())
    }

    pub fn vault_filter(&self) -> VaultFilter {
        VaultFilter {
            show_closed: self.show_closed,
            search: self.vault_search.clone(),
            sort_by: self.vault_sort,
        }
    }
}

fn parse_ms(key: &str, v: &str) -> Result<u64, ConfigError> {
    v.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: expected milliseconds, got {v:?}")))
}
