// src/publishing.rs
use thousands::Separable;

use crate::types::{PositionsSummary, TransformedVaultData};

/// Placeholder for any value that is NaN or infinite.
pub const MISSING: &str = "—";

#[async_trait::async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Fresh positions summary for `address`; replaces whatever was shown before.
    async fn publish_positions(&self, address: &str, summary: &PositionsSummary) -> anyhow::Result<()>;
    /// The positions view for `address` could not be refreshed.
    async fn publish_positions_error(&self, address: &str, error: &str) -> anyhow::Result<()>;
    /// Fresh vault list, already filtered and sorted for display. May be empty.
    async fn publish_vaults(&self, vaults: &[TransformedVaultData]) -> anyhow::Result<()>;
}

/// Plain-text renderer. Good enough for a terminal or a log tail.
pub struct StdoutPublisher;

#[async_trait::async_trait]
impl Publisher for StdoutPublisher {
    async fn publish_positions(&self, address: &str, s: &PositionsSummary) -> anyhow::Result<()> {
        println!("{}", render_positions(address, s));
        Ok(())
    }
    async fn publish_positions_error(&self, address: &str, error: &str) -> anyhow::Result<()> {
        println!("[POSITIONS] {address} ERROR {error}");
        Ok(())
    }
    async fn publish_vaults(&self, vaults: &[TransformedVaultData]) -> anyhow::Result<()> {
        println!("{}", render_vaults(vaults));
        Ok(())
    }
}

pub fn render_positions(address: &str, s: &PositionsSummary) -> String {
    let mut out = format!(
        "[POSITIONS] {address} value={} notional={} maint={} withdrawable={} @{}",
        fmt_usd(s.account_value),
        fmt_usd(s.total_notional),
        fmt_usd(s.maintenance_margin),
        fmt_usd(s.withdrawable),
        s.last_updated,
    );
    for p in &s.positions {
        out.push_str(&format!(
            "\n  {:<8} {:<5} size={} lev={} entry={} mark={} pnl={} roe={} liq={}",
            p.asset,
            p.side.as_str(),
            fmt_num(p.size, 4),
            p.leverage,
            fmt_price(p.entry_price),
            fmt_price(p.current_price),
            fmt_usd(p.unrealized_pnl),
            fmt_percent(p.return_on_equity),
            p.liquidation_price.map(fmt_price).unwrap_or_else(|| "-".into()),
        ));
    }
    out
}

pub fn render_vaults(vaults: &[TransformedVaultData]) -> String {
    let mut out = format!("[VAULTS] {} shown", vaults.len());
    for v in vaults {
        let trend = if v.all_time_pnl >= 0.0 { "up" } else { "down" };
        out.push_str(&format!(
            "\n  {:<32} {} tvl={} apr={} pnl={} {}",
            v.name,
            v.address,
            fmt_tvl_millions(v.tvl),
            fmt_percent(v.apr_change),
            trend,
            if v.is_active { "" } else { "(closed)" },
        ));
    }
    out
}

/// Fixed decimals, or [`MISSING`] when the value is not finite.
pub fn fmt_num(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return MISSING.into();
    }
    format!("{v:.decimals$}")
}

/// Whole dollars with thousands separators, e.g. `-$1,234`.
pub fn fmt_usd(v: f64) -> String {
    if !v.is_finite() {
        return MISSING.into();
    }
    let rounded = v.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", (rounded.abs() as u64).separate_with_commas())
}

pub fn fmt_price(v: f64) -> String {
    if !v.is_finite() {
        return MISSING.into();
    }
    format!("${v:.2}")
}

/// Treats `v` as already being in percent; signed except for zero.
pub fn fmt_percent(v: f64) -> String {
    if !v.is_finite() {
        return MISSING.into();
    }
    let body = format!("{:.2}%", v.abs());
    if body == "0.00%" {
        body
    } else if v > 0.0 {
        format!("+{body}")
    } else {
        format!("-{body}")
    }
}

pub fn fmt_tvl_millions(v: f64) -> String {
    if !v.is_finite() {
        return MISSING.into();
    }
    format!("${:.2}M", v / 1_000_000.0)
}
