// src/lib.rs
pub mod types;
pub mod decimal;
pub mod config;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod publishing;
pub mod providers;
pub mod normalize;
pub mod filter;
pub mod poller;
