// src/normalize/mod.rs
pub mod positions;
pub mod vaults;

pub use positions::normalize_positions;
pub use vaults::{VaultNormalizer, DEFAULT_TOP_N};

/// Shape errors raised while turning a raw payload into its aggregate.
///
/// Numeric garbage is not an error here; it surfaces as NaN in the output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("asset position #{index}: unsupported type {kind:?}")]
    UnsupportedPositionType { index: usize, kind: String },
    #[error("asset position #{index}: missing position payload")]
    MissingPosition { index: usize },
}
