// src/decimal.rs

/// Parse a venue decimal string into `f64`.
///
/// Malformed input yields `NaN` instead of an error or a zero. Downstream
/// consumers are expected to test `is_finite()` and render the value as
/// missing. Surrounding whitespace is ignored; anything else that the standard
/// float grammar rejects (`"12abc"`, `""`) is malformed.
#[inline]
pub fn parse_decimal(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Descending order for floats with NaN placed after every number.
///
/// Used by the stable sorts in the vault ranking and view filter, so equal
/// keys keep their input order.
pub fn cmp_desc_nan_last(a: f64, b: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
