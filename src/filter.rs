// src/filter.rs
use serde::Deserialize;

use crate::decimal::cmp_desc_nan_last;
use crate::types::TransformedVaultData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VaultSortKey {
    #[default]
    Tvl,
    AprChange,
}

/// View-level selection over an already normalized vault list.
#[derive(Debug, Clone, Default)]
pub struct VaultFilter {
    /// Include vaults whose `is_active` is false.
    pub show_closed: bool,
    /// Case-insensitive substring matched against name or address.
    pub search: Option<String>,
    pub sort_by: VaultSortKey,
}

impl VaultFilter {
    /// Visibility and search are combined with AND: a closed vault stays hidden
    /// when `show_closed` is off, whatever the search term.
    pub fn matches(&self, vault: &TransformedVaultData) -> bool {
        if !self.show_closed && !vault.is_active {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => {
                let q = q.to_lowercase();
                vault.name.to_lowercase().contains(&q) || vault.address.to_lowercase().contains(&q)
            }
        }
    }

    /// Filter, then stably sort descending by the chosen key (NaN last).
    pub fn apply(&self, vaults: &[TransformedVaultData]) -> Vec<TransformedVaultData> {
        let mut out: Vec<TransformedVaultData> =
            vaults.iter().filter(|v| self.matches(v)).cloned().collect();
        match self.sort_by {
            VaultSortKey::Tvl => out.sort_by(|a, b| cmp_desc_nan_last(a.tvl, b.tvl)),
            VaultSortKey::AprChange => out.sort_by(|a, b| cmp_desc_nan_last(a.apr_change, b.apr_change)),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VaultChart;

    fn v(name: &str, address: &str, tvl: f64, apr_change: f64, is_active: bool) -> TransformedVaultData {
        TransformedVaultData {
            name: name.into(),
            address: address.into(),
            tvl,
            apr_change,
            chart: VaultChart::default(),
            all_time_pnl: 0.0,
            is_active,
        }
    }

    fn sample() -> Vec<TransformedVaultData> {
        vec![
            v("Hyperliquidity Provider", "0xDFC24B", 300.0, 0.05, true),
            v("Growi HF", "0xAB12", 900.0, 0.30, true),
            v("Old Fund", "0xdead", 500.0, 0.90, false),
        ]
    }

    fn names(out: &[TransformedVaultData]) -> Vec<&str> {
        out.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn hides_closed_by_default() {
        let out = VaultFilter::default().apply(&sample());
        assert_eq!(names(&out), ["Growi HF", "Hyperliquidity Provider"]);
    }

    #[test]
    fn show_closed_includes_everything() {
        let f = VaultFilter { show_closed: true, ..Default::default() };
        assert_eq!(names(&f.apply(&sample())), ["Growi HF", "Old Fund", "Hyperliquidity Provider"]);
    }

    #[test]
    fn search_matches_name_or_address_case_insensitively() {
        let f = VaultFilter { search: Some("dfc24b".into()), ..Default::default() };
        assert_eq!(names(&f.apply(&sample())), ["Hyperliquidity Provider"]);
        let f = VaultFilter { search: Some("GROWI".into()), ..Default::default() };
        assert_eq!(names(&f.apply(&sample())), ["Growi HF"]);
        let f = VaultFilter { search: Some("   ".into()), ..Default::default() };
        assert_eq!(f.apply(&sample()).len(), 2);
    }

    #[test]
    fn search_does_not_reveal_closed_vaults() {
        let f = VaultFilter { search: Some("old".into()), ..Default::default() };
        assert!(f.apply(&sample()).is_empty());
        let f = VaultFilter { search: Some("old".into()), show_closed: true, ..Default::default() };
        assert_eq!(names(&f.apply(&sample())), ["Old Fund"]);
    }

    #[test]
    fn sorts_by_apr_change() {
        let f = VaultFilter { show_closed: true, sort_by: VaultSortKey::AprChange, ..Default::default() };
        assert_eq!(names(&f.apply(&sample())), ["Old Fund", "Growi HF", "Hyperliquidity Provider"]);
    }

    #[test]
    fn nan_keys_sort_last() {
        let mut vaults = sample();
        vaults[1].apr_change = f64::NAN;
        let f = VaultFilter { sort_by: VaultSortKey::AprChange, ..Default::default() };
        assert_eq!(names(&f.apply(&vaults)), ["Hyperliquidity Provider", "Growi HF"]);
    }
}
