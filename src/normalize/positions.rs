// src/normalize/positions.rs
use super::NormalizeError;
use crate::decimal::parse_decimal;
use crate::types::{
    FundingTotals, PositionSide, PositionsSummary, RawPositionDetails, RawPositionSnapshot,
    TransformedPosition,
};

/// The only asset-position variant this normalizer understands.
pub const ONE_WAY: &str = "oneWay";

/// Build the account summary from a clearinghouse snapshot.
///
/// Positions keep their input order. The first entry with an unknown tag or a
/// missing payload fails the whole snapshot; nothing is skipped silently.
pub fn normalize_positions(raw: &RawPositionSnapshot) -> Result<PositionsSummary, NormalizeError> {
    let mut positions = Vec::with_capacity(raw.asset_positions.len());
    for (index, entry) in raw.asset_positions.iter().enumerate() {
        if entry.kind != ONE_WAY {
            return Err(NormalizeError::UnsupportedPositionType {
                index,
                kind: entry.kind.clone(),
            });
        }
        let details = entry
            .position
            .as_ref()
            .ok_or(NormalizeError::MissingPosition { index })?;
        positions.push(normalize_position(details));
    }

    let m = &raw.margin_summary;
    Ok(PositionsSummary {
        account_value: parse_decimal(&m.account_value),
        total_notional: parse_decimal(&m.total_ntl_pos),
        total_raw_usd: parse_decimal(&m.total_raw_usd),
        total_margin_used: parse_decimal(&m.total_margin_used),
        maintenance_margin: parse_decimal(&raw.cross_maintenance_margin_used),
        withdrawable: parse_decimal(&raw.withdrawable),
        positions,
        last_updated: raw.time,
    })
}

fn normalize_position(p: &RawPositionDetails) -> TransformedPosition {
    let szi = parse_decimal(&p.szi);
    let size = szi.abs();
    let position_value = parse_decimal(&p.position_value);
    let roe = parse_decimal(&p.return_on_equity);

    TransformedPosition {
        asset: p.coin.clone(),
        leverage: format!("{}x", p.leverage.value),
        side: PositionSide::from_signed_size(szi),
        position_value,
        size,
        unrealized_pnl: parse_decimal(&p.unrealized_pnl),
        unrealized_pnl_percentage: roe,
        entry_price: parse_decimal(&p.entry_px),
        // IEEE division: a flat position gives +inf (or NaN for 0/0), never a panic.
        current_price: position_value / size,
        return_on_equity: roe,
        liquidation_price: p
            .liquidation_px
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_decimal),
        margin_used: parse_decimal(&p.margin_used),
        max_leverage: p.max_leverage,
        funding: FundingTotals {
            all_time: parse_decimal(&p.cum_funding.all_time),
            since_open: parse_decimal(&p.cum_funding.since_open),
            since_change: parse_decimal(&p.cum_funding.since_change),
        },
    }
}
