// src/providers/mod.rs
use async_trait::async_trait;

use crate::normalize::{normalize_positions, NormalizeError, VaultNormalizer};
use crate::types::{PositionsSummary, RawPositionSnapshot, RawVaultEntry, TransformedVaultData};

pub mod hyperliquid;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Raw clearinghouse snapshot for one account.
    async fn clearinghouse_state(&self, address: &str) -> Result<RawPositionSnapshot, ProviderError>;
}

#[async_trait]
pub trait VaultSource: Send + Sync {
    /// Full raw vault list, unranked.
    async fn vaults(&self) -> Result<Vec<RawVaultEntry>, ProviderError>;
}

/// Fetch and normalize one account's positions. Every failure surfaces.
pub async fn fetch_positions<S>(source: &S, address: &str) -> Result<PositionsSummary, ProviderError>
where
    S: PositionSource + ?Sized,
{
    let raw = source.clearinghouse_state(address).await?;
    Ok(normalize_positions(&raw)?)
}

/// Fetch and rank the vault list. Failures surface; see `fetch_vaults_or_empty`
/// for the degrading variant.
pub async fn fetch_vaults<S>(source: &S, normalizer: &VaultNormalizer) -> Result<Vec<TransformedVaultData>, ProviderError>
where
    S: VaultSource + ?Sized,
{
    let raw = source.vaults().await?;
    Ok(normalizer.normalize(raw))
}

/// Fetch and normalize the vault list. Any failure degrades to an empty list.
pub async fn fetch_vaults_or_empty<S>(source: &S, normalizer: &VaultNormalizer) -> Vec<TransformedVaultData>
where
    S: VaultSource + ?Sized,
{
    fetch_vaults(source, normalizer).await.unwrap_or_else(|err| {
        tracing::warn!("vault fetch failed, showing empty list: {err}");
        Vec::new()
    })
}
