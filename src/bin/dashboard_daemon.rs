// src/bin/dashboard_daemon.rs
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use hyperview::config::{ms, ServiceConfig};
use hyperview::filter::VaultSortKey;
use hyperview::normalize::VaultNormalizer;
use hyperview::poller::{PositionsPoller, VaultsPoller};
use hyperview::providers::hyperliquid::HyperliquidClient;
use hyperview::publishing::StdoutPublisher;

#[derive(Debug, Parser)]
#[command(about = "Poll Hyperliquid positions and vaults and print normalized views")]
struct Args {
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wallet address to watch. Repeat for several accounts.
    #[arg(long = "address")]
    addresses: Vec<String>,
    #[arg(long)]
    show_closed: bool,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    sort: Option<VaultSortKey>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    }
    .with_env()?;
    if !args.addresses.is_empty() {
        cfg.addresses = args.addresses;
    }
    cfg.show_closed |= args.show_closed;
    if args.search.is_some() {
        cfg.vault_search = args.search;
    }
    if let Some(sort) = args.sort {
        cfg.vault_sort = sort;
    }
    cfg.validate()?;

    let client = Arc::new(HyperliquidClient::from_config(&cfg)?);
    let publisher = Arc::new(StdoutPublisher);
    let (stop, shutdown) = watch::channel(false);

    let positions: Vec<_> = cfg
        .addresses
        .iter()
        .map(|addr| PositionsPoller::new(client.clone(), publisher.clone(), addr.clone(), ms(cfg.positions_poll_ms)))
        .collect();
    let vaults = VaultsPoller::new(
        client.clone(),
        publisher.clone(),
        VaultNormalizer::new(cfg.vault_top_n),
        cfg.vault_filter(),
        ms(cfg.vaults_poll_ms),
    );

    tracing::info!(accounts = positions.len(), "starting pollers");
    let all_positions = join_all(positions.iter().map(|p| p.run(shutdown.clone())));
    let vault_loop = vaults.run(shutdown);
    let pollers = async { tokio::join!(all_positions, vault_loop) };
    tokio::pin!(pollers);

    tokio::select! {
        _ = &mut pollers => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("ctrl-c received, stopping");
            let _ = stop.send(true);
            (&mut pollers).await;
        }
    }
    Ok(())
}
