//! Scripted storefront session used by the `storefront-demo` binary.
//!
//! Places a few orders against a small catalog, walks them through the
//! lifecycle (including an illegal request and a cancellation), and reports
//! the resulting stock and notification counters.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use storefront_core::{OrderId, Sku, UserId};
use storefront_infra::{
    CheckoutRequest, InMemoryOrderRepository, InMemoryStockRepository, Storefront,
};
use storefront_inventory::{Product, SellOutcome, StockRecord};
use storefront_notifications::{
    DispatcherStats, LogisticsSubscriber, ManagementSubscriber, TracingSink,
};
use storefront_sales::{LineItem, OrderRepository, TransitionKind};

pub const TEE: &str = "TSHIRT-M-RED";
pub const JACKET: &str = "JACKET-L-NAVY";
pub const TOTE: &str = "TOTE-CANVAS";

pub fn demo_catalog() -> InMemoryStockRepository {
    InMemoryStockRepository::with_records([
        StockRecord::new(
            Sku::new(TEE),
            Product::new("Crew Neck").with_variant("M", "Red"),
            5,
        ),
        StockRecord::new(
            Sku::new(JACKET),
            Product::new("Denim Jacket").with_variant("L", "Navy"),
            2,
        ),
        StockRecord::new(Sku::new(TOTE), Product::new("Canvas Tote"), 20),
    ])
}

/// Register the logistics and management desks, both logging what they display.
pub fn subscribe_staff(storefront: &Storefront) {
    let sink = Arc::new(TracingSink);
    storefront.subscribe(Arc::new(LogisticsSubscriber::new("logistics", sink.clone())));
    storefront.subscribe(Arc::new(ManagementSubscriber::new("management", sink)));
}

fn line(sku: &str, name: &str, quantity: u32, unit_price: u64) -> LineItem {
    LineItem::new(Sku::new(sku), name, quantity, unit_price)
}

fn checkout(
    storefront: &Storefront,
    customer: UserId,
    items: Vec<LineItem>,
) -> anyhow::Result<OrderId> {
    let receipt = storefront
        .workflow()
        .checkout(CheckoutRequest {
            user_id: customer,
            items,
            shipping_address: "742 Evergreen Terrace, Springfield".to_string(),
            payment_method: "card".to_string(),
        })
        .context("checkout failed")?;

    for (sku, outcome) in &receipt.sales {
        if let SellOutcome::InsufficientStock { available, requested } = outcome {
            info!(order_id = %receipt.order.id(), %sku, available, requested, "line could not be fulfilled");
        }
    }
    for (sku, error) in &receipt.failures {
        warn!(order_id = %receipt.order.id(), %sku, %error, "line sale not recorded");
    }
    Ok(receipt.order.id().clone())
}

/// Run the scripted session. Returns the ids of the orders placed.
pub fn run_scenario(storefront: &Storefront) -> anyhow::Result<Vec<OrderId>> {
    let workflow = storefront.workflow();
    let customer = UserId::new();

    // Tee drops to 2: low-stock alert for logistics.
    let first = checkout(
        storefront,
        customer,
        vec![
            line(TEE, "Crew Neck (M - Red)", 3, 1_999),
            line(TOTE, "Canvas Tote", 1, 1_250),
        ],
    )?;

    // Only two jackets in stock: the sale fails, stock is untouched.
    let second = checkout(
        storefront,
        customer,
        vec![line(JACKET, "Denim Jacket (L - Navy)", 3, 8_900)],
    )?;

    for kind in [
        TransitionKind::Process,
        TransitionKind::Ship,
        TransitionKind::Deliver,
        // Delivered orders cannot be canceled.
        TransitionKind::Cancel,
    ] {
        workflow
            .transition(&first, kind)
            .with_context(|| format!("transition {kind} on {first}"))?;
    }

    // Sells out the jackets, then gives them back.
    let third = checkout(
        storefront,
        customer,
        vec![line(JACKET, "Denim Jacket (L - Navy)", 2, 8_900)],
    )?;
    workflow
        .transition(&third, TransitionKind::Process)
        .with_context(|| format!("process {third}"))?;
    workflow
        .transition(&third, TransitionKind::Cancel)
        .with_context(|| format!("cancel {third}"))?;

    Ok(vec![first, second, third])
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub state: String,
    pub total_cost: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockSummary {
    pub sku: String,
    pub product: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub orders: Vec<OrderSummary>,
    pub stock: Vec<StockSummary>,
    pub notifications: DispatcherStats,
    pub commands_executed: usize,
}

pub fn summarize(
    storefront: &Storefront,
    orders: &InMemoryOrderRepository,
    stock: &InMemoryStockRepository,
    placed: &[OrderId],
) -> anyhow::Result<ScenarioSummary> {
    let mut order_rows = Vec::with_capacity(placed.len());
    for id in placed {
        let order = orders
            .find(id)?
            .with_context(|| format!("order {id} missing from store"))?;
        order_rows.push(OrderSummary {
            id: id.to_string(),
            state: order.state().to_string(),
            total_cost: order.total_cost(),
        });
    }

    let stock_rows = stock
        .list()
        .into_iter()
        .map(|record| StockSummary {
            sku: record.sku().to_string(),
            product: record.product().detailed_name(),
            quantity: record.quantity(),
        })
        .collect();

    Ok(ScenarioSummary {
        orders: order_rows,
        stock: stock_rows,
        notifications: storefront.dispatcher().stats(),
        commands_executed: storefront.workflow().history().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storefront_infra::{Runtime, StorefrontConfig};
    use storefront_notifications::{InlineDispatch, ManualScheduler};

    #[test]
    fn scenario_leaves_consistent_stock_and_states() {
        let scheduler = ManualScheduler::new();
        let runtime = Runtime {
            clock: Arc::new(scheduler.clock().clone()),
            scheduler: Arc::new(scheduler.clone()),
            ui: Arc::new(InlineDispatch),
        };
        let (storefront, orders, stock) =
            Storefront::in_memory(StorefrontConfig::default(), runtime, demo_catalog());
        subscribe_staff(&storefront);

        let placed = run_scenario(&storefront).unwrap();
        scheduler.advance(Duration::from_millis(500));
        let summary = summarize(&storefront, &orders, &stock, &placed).unwrap();

        let states: Vec<_> = summary.orders.iter().map(|o| o.state.as_str()).collect();
        assert_eq!(states, vec!["DELIVERED", "PENDING", "CANCELED"]);

        let quantities: Vec<_> = summary
            .stock
            .iter()
            .map(|s| (s.sku.as_str(), s.quantity))
            .collect();
        assert_eq!(quantities, vec![(JACKET, 2), (TOTE, 19), (TEE, 2)]);

        // process, ship, deliver, rejected cancel, process, cancel
        assert_eq!(summary.commands_executed, 6);
        assert_eq!(storefront.dispatcher().pending_stock_alerts(), 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stock"][0]["product"], "Denim Jacket (L - Navy)");
    }
}
