use serde::{Deserialize, Serialize};

use storefront_core::{Entity, Sku, ValueObject};

/// Display info of the product a SKU belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            color: None,
        }
    }

    pub fn with_variant(mut self, size: impl Into<String>, color: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self.color = Some(color.into());
        self
    }

    /// `"{name} ({size} - {color})"` for variant products, plain name otherwise.
    pub fn detailed_name(&self) -> String {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => format!("{} ({} - {})", self.name, size, color),
            _ => self.name.clone(),
        }
    }
}

impl ValueObject for Product {}

/// Stock on hand for one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    sku: Sku,
    product: Product,
    quantity: u32,
}

impl StockRecord {
    pub fn new(sku: Sku, product: Product, quantity: u32) -> Self {
        Self {
            sku,
            product,
            quantity,
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Remove `quantity` units. Returns the remaining stock, or `None` (and
    /// leaves the record untouched) if there is not enough.
    pub(crate) fn take(&mut self, quantity: u32) -> Option<u32> {
        let remaining = self.quantity.checked_sub(quantity)?;
        self.quantity = remaining;
        Some(remaining)
    }

    /// Add `quantity` units, saturating at `u32::MAX`.
    pub(crate) fn put(&mut self, quantity: u32) -> u32 {
        self.quantity = self.quantity.saturating_add(quantity);
        self.quantity
    }
}

impl Entity for StockRecord {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_name_includes_variant_when_complete() {
        let tee = Product::new("Crew Neck").with_variant("M", "Red");
        assert_eq!(tee.detailed_name(), "Crew Neck (M - Red)");

        let mut half = Product::new("Tote Bag");
        half.size = Some("L".to_string());
        assert_eq!(half.detailed_name(), "Tote Bag");
        assert_eq!(Product::new("Gift Card").detailed_name(), "Gift Card");
    }

    #[test]
    fn take_never_goes_negative() {
        let mut record = StockRecord::new(Sku::new("X"), Product::new("X"), 2);

        assert_eq!(record.take(3), None);
        assert_eq!(record.quantity(), 2);
        assert_eq!(record.take(2), Some(0));
        assert_eq!(record.quantity(), 0);
    }

    #[test]
    fn put_saturates() {
        let mut record = StockRecord::new(Sku::new("X"), Product::new("X"), u32::MAX - 1);
        assert_eq!(record.put(10), u32::MAX);
    }

    #[test]
    fn serializes_with_product_info() {
        let record = StockRecord::new(
            Sku::new("JACKET-L-NAVY"),
            Product::new("Denim Jacket").with_variant("L", "Navy"),
            4,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sku"], "JACKET-L-NAVY");
        assert_eq!(json["product"]["size"], "L");
        assert_eq!(json["quantity"], 4);
    }
}
