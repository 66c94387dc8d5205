// src/normalize/vaults.rs
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::decimal::{cmp_desc_nan_last, parse_decimal};
use crate::types::{RawVaultEntry, TransformedVaultData, VaultChart};

pub const DEFAULT_TOP_N: usize = 50;
pub const ALL_TIME: &str = "allTime";
/// Literal zero as the venue formats it. Matched as a string, not numerically:
/// `"0.00"` counts as a non-zero sample.
pub const ZERO_PNL: &str = "0.0";

/// Ranks raw vaults by TVL and shapes the survivors for display.
#[derive(Debug, Clone)]
pub struct VaultNormalizer {
    pub top_n: usize,
}

impl Default for VaultNormalizer {
    fn default() -> Self { Self { top_n: DEFAULT_TOP_N } }
}

impl VaultNormalizer {
    pub fn new(top_n: usize) -> Self { Self { top_n } }

    pub fn normalize(&self, raw: Vec<RawVaultEntry>) -> Vec<TransformedVaultData> {
        self.normalize_at(raw, Utc::now())
    }

    /// Same as [`normalize`](Self::normalize) with an explicit "now" for the
    /// synthetic chart labels.
    ///
    /// Ranking happens before shaping: the list is stably sorted by TVL
    /// (descending, unparseable TVL last) and cut to `top_n`, so vaults tied at
    /// the cutoff are dropped by input order.
    pub fn normalize_at(&self, raw: Vec<RawVaultEntry>, now: DateTime<Utc>) -> Vec<TransformedVaultData> {
        let mut ranked: Vec<(f64, RawVaultEntry)> = raw
            .into_iter()
            .map(|v| (parse_decimal(&v.summary.tvl), v))
            .collect();
        ranked.sort_by(|a, b| cmp_desc_nan_last(a.0, b.0));
        ranked.truncate(self.top_n);

        ranked
            .into_iter()
            .map(|(tvl, vault)| shape_vault(tvl, vault, now))
            .collect()
    }
}

fn shape_vault(tvl: f64, vault: RawVaultEntry, now: DateTime<Utc>) -> TransformedVaultData {
    let series: &[String] = vault
        .pnls
        .iter()
        .find(|(timeframe, _)| timeframe == ALL_TIME)
        .map(|(_, values)| values.as_slice())
        .unwrap_or(&[]);

    let latest = latest_nonzero_pnl(series);
    let apr_change = apr_change(vault.apr, latest, series);

    TransformedVaultData {
        name: vault.summary.name,
        address: vault.summary.vault_address,
        tvl,
        apr_change,
        chart: VaultChart {
            labels: daily_labels(series.len(), now),
            values: series.iter().rev().map(|v| parse_decimal(v)).collect(),
        },
        all_time_pnl: parse_decimal(latest),
        is_active: !vault.summary.is_closed,
    }
}

/// Newest entry that is not the literal `"0.0"`, scanning from the end.
fn latest_nonzero_pnl(series: &[String]) -> &str {
    series
        .iter()
        .rev()
        .map(String::as_str)
        .find(|v| *v != ZERO_PNL)
        .unwrap_or(ZERO_PNL)
}

/// Venue APR when present, otherwise `latest - series[1]`.
///
/// The fallback is a rough stand-in for a missing APR, not an annualized rate.
/// A null, zero or NaN APR counts as missing.
fn apr_change(apr: Option<f64>, latest: &str, series: &[String]) -> f64 {
    if let Some(apr) = apr.filter(|a| *a != 0.0 && !a.is_nan()) {
        return apr;
    }
    let second = series.get(1).map(String::as_str).unwrap_or(ZERO_PNL);
    parse_decimal(latest) - parse_decimal(second)
}

/// `n` labels, one per day counting back from `now`. They do not reflect
/// actual sample times.
fn daily_labels(n: usize, now: DateTime<Utc>) -> Vec<String> {
    (0..n)
        .map(|i| (now - Duration::days(i as i64)).to_rfc3339_opts(SecondsFormat::Millis, true))
        .collect()
}
