use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, OrderId, Sku, UserId, ValueObject};

/// Order lifecycle state.
///
/// Persisted by its upper-case name; unknown names are rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderState {
    pub const ALL: [OrderState; 5] = [
        OrderState::Pending,
        OrderState::Processing,
        OrderState::Shipped,
        OrderState::Delivered,
        OrderState::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Pending => "PENDING",
            OrderState::Processing => "PROCESSING",
            OrderState::Shipped => "SHIPPED",
            OrderState::Delivered => "DELIVERED",
            OrderState::Canceled => "CANCELED",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Canceled)
    }
}

impl core::fmt::Display for OrderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::unknown_state(s))
    }
}

/// Order line: SKU, quantity, unit price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Sku,
    /// Display name of the product variant at order time.
    pub product_name: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl LineItem {
    pub fn new(
        sku: Sku,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: u64,
    ) -> Self {
        Self {
            sku,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

impl ValueObject for LineItem {}

/// A customer order.
///
/// Built once through [`OrderBuilder`]; afterwards only its state changes,
/// and only through the order state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<LineItem>,
    shipping_address: String,
    payment_method: String,
    total_cost: u64,
    created_at: DateTime<Utc>,
    state: OrderState,
}

impl Order {
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    /// Total in smallest currency unit; fixed at construction.
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: OrderState) {
        self.state = state;
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Validated construction of an [`Order`].
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    id: OrderId,
    user_id: UserId,
    items: Vec<LineItem>,
    shipping_address: String,
    payment_method: String,
    created_at: Option<DateTime<Utc>>,
}

impl OrderBuilder {
    pub fn new(user_id: UserId, id: OrderId) -> Self {
        Self {
            id,
            user_id,
            items: Vec::new(),
            shipping_address: String::new(),
            payment_method: String::new(),
            created_at: None,
        }
    }

    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn shipping_address(mut self, address: impl Into<String>) -> Self {
        self.shipping_address = address.into();
        self
    }

    pub fn payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = method.into();
        self
    }

    /// Override the creation timestamp (defaults to now).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn build(self) -> DomainResult<Order> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order needs at least one line item"));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::validation("line item quantity must be positive"));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address cannot be empty"));
        }
        if self.payment_method.trim().is_empty() {
            return Err(DomainError::validation("payment method cannot be empty"));
        }

        let total_cost = self
            .items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.line_total()));

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items: self.items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            total_cost,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            state: OrderState::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee(quantity: u32) -> LineItem {
        LineItem::new(Sku::new("TSHIRT-M-RED"), "Crew Neck (M - Red)", quantity, 2_990)
    }

    fn builder() -> OrderBuilder {
        OrderBuilder::new(UserId::new(), OrderId::new("ORD-00000001"))
            .shipping_address("221B Baker Street, London, NW1")
            .payment_method("card")
    }

    #[test]
    fn build_computes_total_and_starts_pending() {
        let jacket = LineItem::new(Sku::new("JACKET-L-NAVY"), "Denim Jacket (L - Navy)", 1, 5_090);
        let order = builder().item(tee(2)).item(jacket).build().unwrap();

        assert_eq!(order.total_cost(), 2 * 2_990 + 5_090);
        assert_eq!(order.state(), OrderState::Pending);
        assert_eq!(order.items().len(), 2);
    }

    #[test]
    fn build_rejects_missing_parts() {
        let no_items = builder().build().unwrap_err();
        assert!(matches!(no_items, DomainError::Validation(msg) if msg.contains("line item")));

        let no_address = OrderBuilder::new(UserId::new(), OrderId::new("ORD-2"))
            .payment_method("card")
            .item(tee(1))
            .build()
            .unwrap_err();
        assert!(matches!(no_address, DomainError::Validation(msg) if msg.contains("address")));

        let blank_payment = builder().payment_method("   ").item(tee(1)).build().unwrap_err();
        assert!(matches!(blank_payment, DomainError::Validation(msg) if msg.contains("payment")));

        let zero_quantity = builder().item(tee(0)).build().unwrap_err();
        assert!(matches!(zero_quantity, DomainError::Validation(_)));
    }

    #[test]
    fn state_names_parse_and_reject_unknown() {
        for state in OrderState::ALL {
            assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
        }
        assert_eq!(
            "SHIPPING".parse::<OrderState>().unwrap_err(),
            DomainError::UnknownState("SHIPPING".to_string())
        );
    }

    #[test]
    fn serde_uses_state_names_and_rejects_unknown() {
        let order = builder().item(tee(1)).build().unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["state"], "PENDING");

        let mut corrupted = json.clone();
        corrupted["state"] = serde_json::Value::String("LOST".to_string());
        assert!(serde_json::from_value::<Order>(corrupted).is_err());

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn unit_price_is_captured_per_line() {
        let order = builder().item(tee(3)).build().unwrap();
        assert_eq!(order.items()[0].unit_price, 2_990);
        assert_eq!(order.items()[0].line_total(), 8_970);
    }
}
