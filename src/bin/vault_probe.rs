use hyperview::config::ServiceConfig;
use hyperview::filter::{VaultFilter, VaultSortKey};
use hyperview::normalize::VaultNormalizer;
use hyperview::providers::{fetch_vaults_or_empty, hyperliquid::HyperliquidClient};
use hyperview::publishing::render_vaults;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let search = std::env::args().nth(1);
    let cfg = ServiceConfig::default().with_env()?;
    let client = HyperliquidClient::from_config(&cfg)?;
    let ranked = fetch_vaults_or_empty(&client, &VaultNormalizer::new(cfg.vault_top_n)).await;
    let filter = VaultFilter { show_closed: true, search, sort_by: VaultSortKey::Tvl };
    println!("{}", render_vaults(&filter.apply(&ranked)));
    Ok(())
}
