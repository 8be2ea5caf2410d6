//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::Sku;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Configuration(ConfigurationEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Product(e) => ("products", e.name()),
            Self::Configuration(e) => ("configurations", e.name()),
            Self::Order(e) => ("orders", e.name()),
        };
        format!("storefront.{aggregate}.{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, sku: Sku },
    Published { product_id: Uuid },
    Archived { product_id: Uuid },
    InventoryRemoved { product_id: Uuid, quantity: u32 },
}

impl ProductEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Published { .. } => "published",
            Self::Archived { .. } => "archived",
            Self::InventoryRemoved { .. } => "inventory_removed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigurationEvent {
    Confirmed { configuration_id: Uuid, user_id: String },
    Ordered { configuration_id: Uuid, order_id: Uuid },
    Abandoned { configuration_id: Uuid },
}

impl ConfigurationEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Ordered { .. } => "ordered",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: u64, user_id: String, total: Decimal },
    Paid { order_id: Uuid },
    Shipped { order_id: Uuid },
    Delivered { order_id: Uuid },
    Cancelled { order_id: Uuid, refunded: bool },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Paid { .. } => "paid",
            Self::Shipped { .. } => "shipped",
            Self::Delivered { .. } => "delivered",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
