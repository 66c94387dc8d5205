// src/types.rs
use serde::{Deserialize, Serialize};

// ---- Raw clearinghouse snapshot (POST /info, type=clearinghouseState) ----
//
// Numerics stay as the venue sends them: decimal strings. Parsing happens in
// exactly one place, `crate::decimal::parse_decimal`.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarginSummary {
    pub account_value: String,
    pub total_ntl_pos: String,
    pub total_raw_usd: String,
    pub total_margin_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPositionSnapshot {
    pub margin_summary: RawMarginSummary,
    pub cross_margin_summary: RawMarginSummary,
    pub cross_maintenance_margin_used: String,
    pub withdrawable: String,
    #[serde(default)]
    pub asset_positions: Vec<RawAssetPosition>,
    pub time: i64, // unix ms
}

/// One entry of `assetPositions`. The tag and payload are decoded loosely so
/// the normalizer can reject unknown variants with the entry index attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAssetPosition {
    #[serde(rename = "type")]
    pub kind: String, // "oneWay" is the only variant handled
    #[serde(default)]
    pub position: Option<RawPositionDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPositionDetails {
    pub coin: String,
    pub szi: String, // signed size, sign encodes direction
    pub leverage: RawLeverage,
    pub entry_px: String,
    pub position_value: String,
    pub unrealized_pnl: String,
    pub return_on_equity: String,
    #[serde(default)]
    pub liquidation_px: Option<String>,
    pub margin_used: String,
    pub max_leverage: u32,
    pub cum_funding: RawCumFunding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLeverage {
    #[serde(rename = "type")]
    pub kind: String, // "cross"
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCumFunding {
    pub all_time: String,
    pub since_open: String,
    pub since_change: String,
}

// ---- Raw vault list (GET stats-data /Mainnet/vaults) ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVaultEntry {
    /// Absent or `null` for some vaults.
    #[serde(default)]
    pub apr: Option<f64>,
    /// `[timeframe, values]` pairs; timeframe is one of day|week|month|allTime.
    #[serde(default)]
    pub pnls: Vec<(String, Vec<String>)>,
    pub summary: RawVaultSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVaultSummary {
    pub name: String,
    pub vault_address: String,
    pub leader: String,
    pub tvl: String,
    pub is_closed: bool,
    pub relationship: RawRelationship,
    pub create_time_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    #[serde(rename = "type")]
    pub kind: String, // "normal" | "parent" | "child"
}

// ---- Derived, display-ready records ----
//
// Output only. serde_json writes NaN and infinities as `null`, so a JSON dump
// of these records does not read back into the same values.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// `Long` iff the signed size is strictly positive; zero and NaN are `Short`.
    pub fn from_signed_size(szi: f64) -> Self {
        if szi > 0.0 { PositionSide::Long } else { PositionSide::Short }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingTotals {
    pub all_time: f64,
    pub since_open: f64,
    pub since_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedPosition {
    pub asset: String,
    pub leverage: String, // display form, e.g. "20x"
    #[serde(rename = "type")]
    pub side: PositionSide,
    pub position_value: f64,
    pub size: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percentage: f64,
    pub entry_price: f64,
    pub current_price: f64, // +inf when size is zero
    pub return_on_equity: f64,
    pub liquidation_price: Option<f64>,
    pub margin_used: f64,
    pub max_leverage: u32,
    pub funding: FundingTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsSummary {
    pub account_value: f64,
    pub total_notional: f64,
    pub total_raw_usd: f64,
    pub total_margin_used: f64,
    pub maintenance_margin: f64,
    pub withdrawable: f64,
    pub positions: Vec<TransformedPosition>,
    pub last_updated: i64, // unix ms, copied from the snapshot
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VaultChart {
    pub labels: Vec<String>, // synthetic daily ISO-8601 stamps ending now
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedVaultData {
    pub name: String,
    pub address: String,
    pub tvl: f64,
    pub apr_change: f64,
    pub chart: VaultChart,
    pub all_time_pnl: f64,
    pub is_active: bool,
}
