// src/poller.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::filter::VaultFilter;
use crate::normalize::VaultNormalizer;
use crate::providers::{fetch_positions, fetch_vaults, PositionSource, ProviderError, VaultSource};
use crate::publishing::Publisher;
use crate::types::{PositionsSummary, TransformedVaultData};

/// Latest outcome of a feed. Each cycle replaces the previous state outright.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> FeedState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            FeedState::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(feature = "metrics")]
fn observe(feed: &str, ok: bool, started: Instant) {
    crate::metrics::observe(feed, ok, started.elapsed().as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
fn observe(_feed: &str, _ok: bool, _started: Instant) {}

/// Polls one account's clearinghouse state.
///
/// Cycles never overlap: the next tick is only taken once the current fetch
/// has finished, and ticks missed meanwhile are skipped.
pub struct PositionsPoller<Pu>
where
    Pu: Publisher,
{
    source: Arc<dyn PositionSource>,
    publisher: Arc<Pu>,
    address: String,
    every: Duration,
    latest: watch::Sender<FeedState<PositionsSummary>>,
}

impl<Pu> PositionsPoller<Pu>
where
    Pu: Publisher,
{
    pub fn new(source: Arc<dyn PositionSource>, publisher: Arc<Pu>, address: impl Into<String>, every: Duration) -> Self {
        let (latest, _) = watch::channel(FeedState::Pending);
        Self { source, publisher, address: address.into(), every, latest }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<PositionsSummary>> {
        self.latest.subscribe()
    }

    pub fn snapshot(&self) -> FeedState<PositionsSummary> {
        self.latest.borrow().clone()
    }

    /// One fetch-normalize-publish cycle. Errors replace the last summary.
    pub async fn tick_once(&self) -> Result<(), ProviderError> {
        let started = Instant::now();
        match fetch_positions(self.source.as_ref(), &self.address).await {
            Ok(summary) => {
                observe("positions", true, started);
                tracing::info!(
                    address = %self.address,
                    positions = summary.positions.len(),
                    "positions refreshed"
                );
                if let Err(e) = self.publisher.publish_positions(&self.address, &summary).await {
                    tracing::warn!("publish_positions failed: {e:?}");
                }
                self.latest.send_replace(FeedState::Ready(summary));
                Ok(())
            }
            Err(err) => {
                observe("positions", false, started);
                tracing::error!(address = %self.address, "positions fetch failed: {err}");
                let msg = err.to_string();
                if let Err(e) = self.publisher.publish_positions_error(&self.address, &msg).await {
                    tracing::warn!("publish_positions_error failed: {e:?}");
                }
                self.latest.send_replace(FeedState::Failed(msg));
                Err(err)
            }
        }
    }

    /// Poll until `shutdown` flips to true or its sender is dropped. A fetch
    /// still in flight at that point is dropped, which aborts the request.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = self.tick_once() => {}
                _ = shutdown.changed() => {
                    tracing::debug!(address = %self.address, "shutdown with positions fetch in flight");
                    break;
                }
            }
        }
        tracing::info!(address = %self.address, "positions poller stopped");
    }
}

/// Polls the vault list. Failures show up as an empty list, never as an error.
pub struct VaultsPoller<Pu>
where
    Pu: Publisher,
{
    source: Arc<dyn VaultSource>,
    publisher: Arc<Pu>,
    normalizer: VaultNormalizer,
    filter: VaultFilter,
    every: Duration,
    latest: watch::Sender<FeedState<Vec<TransformedVaultData>>>,
}

impl<Pu> VaultsPoller<Pu>
where
    Pu: Publisher,
{
    pub fn new(
        source: Arc<dyn VaultSource>,
        publisher: Arc<Pu>,
        normalizer: VaultNormalizer,
        filter: VaultFilter,
        every: Duration,
    ) -> Self {
        let (latest, _) = watch::channel(FeedState::Pending);
        Self { source, publisher, normalizer, filter, every, latest }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<Vec<TransformedVaultData>>> {
        self.latest.subscribe()
    }

    /// Latest ranked list run through `filter`; empty until the first cycle.
    pub fn view(&self, filter: &VaultFilter) -> Vec<TransformedVaultData> {
        match &*self.latest.borrow() {
            FeedState::Ready(vaults) => filter.apply(vaults),
            _ => Vec::new(),
        }
    }

    /// One cycle. Returns how many vaults were published after filtering.
    pub async fn tick_once(&self) -> usize {
        let started = Instant::now();
        let fetched = fetch_vaults(self.source.as_ref(), &self.normalizer).await;
        observe("vaults", fetched.is_ok(), started);
        let ranked = fetched.unwrap_or_else(|err| {
            tracing::warn!("vault fetch failed, showing empty list: {err}");
            Vec::new()
        });

        let shown = self.filter.apply(&ranked);
        tracing::info!(ranked = ranked.len(), shown = shown.len(), "vaults refreshed");
        if let Err(e) = self.publisher.publish_vaults(&shown).await {
            tracing::warn!("publish_vaults failed: {e:?}");
        }
        self.latest.send_replace(FeedState::Ready(ranked));
        shown.len()
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = self.tick_once() => {}
                _ = shutdown.changed() => {
                    tracing::debug!("shutdown with vault fetch in flight");
                    break;
                }
            }
        }
        tracing::info!("vaults poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::VaultSortKey;
    use crate::types::{
        RawAssetPosition, RawMarginSummary, RawPositionSnapshot, RawRelationship, RawVaultEntry,
        RawVaultSummary,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        positions: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
        vaults: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Publisher for Recorder {
        async fn publish_positions(&self, address: &str, _s: &PositionsSummary) -> anyhow::Result<()> {
            self.positions.lock().unwrap().push(address.to_string());
            Ok(())
        }
        async fn publish_positions_error(&self, _address: &str, error: &str) -> anyhow::Result<()> {
            self.errors.lock().unwrap().push(error.to_string());
            Ok(())
        }
        async fn publish_vaults(&self, vaults: &[TransformedVaultData]) -> anyhow::Result<()> {
            self.vaults.lock().unwrap().push(vaults.len());
            Ok(())
        }
    }

    /// Fails every call after the first `ok_calls`.
    struct FlakySource {
        ok_calls: usize,
        calls: AtomicUsize,
    }

    fn margin() -> RawMarginSummary {
        RawMarginSummary {
            account_value: "1.0".into(),
            total_ntl_pos: "0.0".into(),
            total_raw_usd: "1.0".into(),
            total_margin_used: "0.0".into(),
        }
    }

    #[async_trait]
    impl PositionSource for FlakySource {
        async fn clearinghouse_state(&self, _address: &str) -> Result<RawPositionSnapshot, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.ok_calls {
                return Err(ProviderError::Status { status: 502, body: "bad gateway".into() });
            }
            Ok(RawPositionSnapshot {
                margin_summary: margin(),
                cross_margin_summary: margin(),
                cross_maintenance_margin_used: "0.0".into(),
                withdrawable: "1.0".into(),
                asset_positions: Vec::<RawAssetPosition>::new(),
                time: n as i64,
            })
        }
    }

    #[async_trait]
    impl VaultSource for FlakySource {
        async fn vaults(&self) -> Result<Vec<RawVaultEntry>, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.ok_calls {
                return Err(ProviderError::Status { status: 503, body: String::new() });
            }
            Ok(["closed", "open"]
                .iter()
                .enumerate()
                .map(|(i, name)| RawVaultEntry {
                    apr: Some(0.1),
                    pnls: vec![],
                    summary: RawVaultSummary {
                        name: name.to_string(),
                        vault_address: format!("0x{i}"),
                        leader: "0x0".into(),
                        tvl: format!("{}", 100 * (i + 1)),
                        is_closed: *name == "closed",
                        relationship: RawRelationship { kind: "normal".into() },
                        create_time_millis: 0,
                    },
                })
                .collect())
        }
    }

    /// Takes 12s per call and records how many calls overlap.
    #[derive(Default)]
    struct SlowSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PositionSource for SlowSource {
        async fn clearinghouse_state(&self, _address: &str) -> Result<RawPositionSnapshot, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(12)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(RawPositionSnapshot {
                margin_summary: margin(),
                cross_margin_summary: margin(),
                cross_maintenance_margin_used: "0.0".into(),
                withdrawable: "1.0".into(),
                asset_positions: Vec::new(),
                time: n as i64,
            })
        }
    }

    /// Answers with an empty vault list.
    #[cfg(feature = "metrics")]
    struct NoVaults;

    #[cfg(feature = "metrics")]
    #[async_trait]
    impl VaultSource for NoVaults {
        async fn vaults(&self) -> Result<Vec<RawVaultEntry>, ProviderError> {
            Ok(Vec::new())
        }
    }

    // Vault tests that may bump the process-wide failure counter take this lock.
    static VAULT_FEED: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

    /// Never answers; used to observe cancellation.
    struct HangingSource;

    #[async_trait]
    impl PositionSource for HangingSource {
        async fn clearinghouse_state(&self, _address: &str) -> Result<RawPositionSnapshot, ProviderError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn positions_error_replaces_last_summary() {
        let publisher = Arc::new(Recorder::default());
        let source = Arc::new(FlakySource { ok_calls: 1, calls: AtomicUsize::new(0) });
        let poller = PositionsPoller::new(source, publisher.clone(), "0xabc", Duration::from_secs(5));
        let mut rx = poller.subscribe();
        assert_eq!(poller.snapshot(), FeedState::Pending);

        poller.tick_once().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().ready().map(|s| s.last_updated), Some(0));

        assert!(poller.tick_once().await.is_err());
        assert!(matches!(poller.snapshot(), FeedState::Failed(msg) if msg.contains("502")));
        assert_eq!(publisher.positions.lock().unwrap().as_slice(), ["0xabc"]);
        assert_eq!(publisher.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn vault_failures_publish_an_empty_list() {
        let _guard = VAULT_FEED.lock().await;
        let publisher = Arc::new(Recorder::default());
        let source = Arc::new(FlakySource { ok_calls: 1, calls: AtomicUsize::new(0) });
        let poller = VaultsPoller::new(
            source,
            publisher.clone(),
            VaultNormalizer::default(),
            VaultFilter::default(),
            Duration::from_secs(30),
        );

        assert_eq!(poller.tick_once().await, 1); // closed vault hidden
        let everything = VaultFilter { show_closed: true, sort_by: VaultSortKey::Tvl, search: None };
        assert_eq!(poller.view(&everything).len(), 2);

        assert_eq!(poller.tick_once().await, 0);
        assert_eq!(poller.snapshot_len(), 0);
        assert_eq!(publisher.vaults.lock().unwrap().as_slice(), [1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_on_interval_until_shutdown() {
        let publisher = Arc::new(Recorder::default());
        let source = Arc::new(FlakySource { ok_calls: usize::MAX, calls: AtomicUsize::new(0) });
        let poller = Arc::new(PositionsPoller::new(
            source.clone(),
            publisher.clone(),
            "0xabc",
            Duration::from_secs(5),
        ));
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(rx).await }
        });

        // First tick fires immediately, then every 5s.
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        stop.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_never_overlap() {
        let publisher = Arc::new(Recorder::default());
        let source = Arc::new(SlowSource::default());
        let poller = Arc::new(PositionsPoller::new(
            source.clone(),
            publisher.clone(),
            "0xabc",
            Duration::from_secs(5),
        ));
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(rx).await }
        });

        // Each 12s fetch swallows two ticks; cycles start at 0, 12, 24, 36 and 48.
        tokio::time::sleep(Duration::from_secs(58)).await;
        stop.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert_eq!(publisher.positions.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn vaults_run_polls_on_interval_until_shutdown() {
        let _guard = VAULT_FEED.lock().await;
        let publisher = Arc::new(Recorder::default());
        let source = Arc::new(FlakySource { ok_calls: usize::MAX, calls: AtomicUsize::new(0) });
        let poller = Arc::new(VaultsPoller::new(
            source.clone(),
            publisher.clone(),
            VaultNormalizer::default(),
            VaultFilter::default(),
            Duration::from_secs(30),
        ));
        let mut latest = poller.subscribe();
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(65)).await;
        stop.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(publisher.vaults.lock().unwrap().as_slice(), [1, 1, 1]);
        assert!(latest.has_changed().unwrap());
        assert_eq!(latest.borrow_and_update().ready().map(Vec::len), Some(2));
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn vault_failure_metric_counts_fetch_errors_only() {
        let _guard = VAULT_FEED.lock().await;
        let failures = || crate::metrics::POLL_FAILURES_TOTAL.with_label_values(&["vaults"]).get();
        let publisher = Arc::new(Recorder::default());
        let poller = |source: Arc<dyn VaultSource>| {
            VaultsPoller::new(
                source,
                publisher.clone(),
                VaultNormalizer::default(),
                VaultFilter::default(),
                Duration::from_secs(30),
            )
        };

        let before = failures();
        assert_eq!(poller(Arc::new(NoVaults)).tick_once().await, 0);
        assert_eq!(failures(), before);

        let broken = FlakySource { ok_calls: 0, calls: AtomicUsize::new(0) };
        assert_eq!(poller(Arc::new(broken)).tick_once().await, 0);
        assert_eq!(failures(), before + 1);
        assert_eq!(publisher.vaults.lock().unwrap().as_slice(), [0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_in_flight_fetch() {
        let publisher = Arc::new(Recorder::default());
        let poller = Arc::new(PositionsPoller::new(
            Arc::new(HangingSource),
            publisher.clone(),
            "0xabc",
            Duration::from_secs(5),
        ));
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(rx).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(poller.snapshot(), FeedState::Pending);
        assert!(publisher.positions.lock().unwrap().is_empty());
    }

    impl<Pu: Publisher> VaultsPoller<Pu> {
        fn snapshot_len(&self) -> usize {
            self.latest.borrow().ready().map(Vec::len).unwrap_or(0)
        }
    }
}
