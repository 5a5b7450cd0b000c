use anyhow::Context;

use storefront_app::{demo_catalog, run_scenario, subscribe_staff, summarize};
use storefront_infra::{Runtime, Storefront, StorefrontConfig};

fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = StorefrontConfig::from_env();
    let debounce = config.notifications.debounce;
    let runtime = Runtime::threaded().context("failed to start notification timer thread")?;
    let (storefront, orders, stock) = Storefront::in_memory(config, runtime, demo_catalog());
    subscribe_staff(&storefront);

    let placed = run_scenario(&storefront)?;

    // Let the last debounced stock alerts fire before reporting.
    std::thread::sleep(debounce + std::time::Duration::from_millis(100));

    let summary = summarize(&storefront, orders.as_ref(), stock.as_ref(), &placed)?;
    tracing::info!(orders = summary.orders.len(), "demo scenario finished");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
