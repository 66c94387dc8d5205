// src/metrics.rs
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static POLLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hyperview_polls_total", "Poll cycles completed", &["feed"] // positions|vaults
    ).expect("register hyperview_polls_total")
});

pub static POLL_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hyperview_poll_failures_total", "Poll cycles that failed", &["feed"]
    ).expect("register hyperview_poll_failures_total")
});

pub static FETCH_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "hyperview_fetch_latency_seconds",
        "Fetch plus normalize latency",
        &["feed"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).expect("register hyperview_fetch_latency_seconds")
});

/// Record one finished cycle.
pub fn observe(feed: &str, ok: bool, secs: f64) {
    POLLS_TOTAL.with_label_values(&[feed]).inc();
    if !ok {
        POLL_FAILURES_TOTAL.with_label_values(&[feed]).inc();
    }
    FETCH_LATENCY.with_label_values(&[feed]).observe(secs);
}
