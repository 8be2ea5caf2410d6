//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::product::Product;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{self, PricingError};
use crate::domain::value_objects::{LocalizedText, Money, Selection, SelectionError, Sku};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_number: u64,
    user_id: String,
    status: OrderStatus,
    payment: PaymentStatus,
    lines: Vec<OrderLine>,
    currency: String,
    subtotal: Decimal,
    shipping: Decimal,
    savings: Decimal,
    total: Decimal,
    shipping_address: ShippingAddress,
    configuration_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Product snapshot and prices at the moment the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub sku: Sku,
    pub name: LocalizedText,
    pub selection: Selection,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub discounted_unit_price: Decimal,
    pub surcharge: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 2, max = 120))]
    pub full_name: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 200))]
    pub street: String,
    #[validate(length(min = 2, max = 80))]
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    #[validate(length(min = 2, max = 56))]
    pub country: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Processing => "processing", Self::Shipped => "shipped",
            Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Refunded }

/// One product line requested for a new order.
pub struct OrderItem<'a> {
    pub product: &'a Product,
    pub selection: &'a Selection,
    pub quantity: u32,
}

impl Order {
    pub fn place(
        order_number: u64,
        user_id: impl Into<String>,
        items: &[OrderItem<'_>],
        shipping_address: ShippingAddress,
        shipping_fee: Decimal,
        currency: &str,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let mut inputs = Vec::with_capacity(items.len());
        let mut selections = Vec::with_capacity(items.len());
        for item in items {
            if !item.product.is_active() { return Err(OrderError::ProductUnavailable(item.product.id())); }
            if item.product.inventory().value() < item.quantity { return Err(OrderError::InsufficientInventory(item.product.id())); }
            let (selection, input) = item.product.line_input(item.selection, item.quantity)?;
            selections.push(selection);
            inputs.push(input);
        }
        let quote = pricing::quote_order(&inputs, shipping_fee)?;
        let lines = items.iter().zip(selections).zip(&quote.lines).map(|((item, selection), q)| OrderLine {
            product_id: item.product.id(),
            sku: item.product.sku().clone(),
            name: item.product.name().clone(),
            selection,
            quantity: q.quantity,
            unit_price: q.unit_price,
            discount_percent: q.discount_percent,
            discounted_unit_price: q.discounted_unit_price,
            surcharge: q.surcharge,
            line_total: q.line_total,
        }).collect();

        let id = Uuid::now_v7();
        let now = Utc::now();
        let user_id = user_id.into();
        let mut order = Self {
            id, order_number, user_id: user_id.clone(), status: OrderStatus::Pending, payment: PaymentStatus::Pending,
            lines, currency: currency.to_string(), subtotal: quote.subtotal, shipping: quote.shipping,
            savings: quote.savings, total: quote.total, shipping_address, configuration_id: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, order_number, user_id, total: quote.total }));
        Ok(order)
    }

    pub fn with_configuration(mut self, configuration_id: Uuid) -> Self {
        self.configuration_id = Some(configuration_id);
        self
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> u64 { self.order_number }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn subtotal(&self) -> Money { Money::new(self.subtotal, &self.currency) }
    pub fn shipping(&self) -> Money { Money::new(self.shipping, &self.currency) }
    pub fn savings(&self) -> Money { Money::new(self.savings, &self.currency) }
    pub fn total(&self) -> Money { Money::new(self.total, &self.currency) }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn configuration_id(&self) -> Option<Uuid> { self.configuration_id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(self.invalid("pay")); }
        self.payment = PaymentStatus::Paid;
        self.status = OrderStatus::Processing;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id }));
        Ok(())
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Processing { return Err(self.invalid("ship")); }
        self.status = OrderStatus::Shipped;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id }));
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Shipped { return Err(self.invalid("deliver")); }
        self.status = OrderStatus::Delivered;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Processing) { return Err(OrderError::CannotCancel(self.status)); }
        let refunded = self.payment == PaymentStatus::Paid;
        if refunded { self.payment = PaymentStatus::Refunded; }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, refunded }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn invalid(&self, action: &'static str) -> OrderError { OrderError::InvalidTransition { from: self.status, action } }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Cannot cancel an order that is {}", .0.as_str())]
    CannotCancel(OrderStatus),
    #[error("Cannot {action} an order that is {}", .from.as_str())]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error("Product {0} is not available for sale")]
    ProductUnavailable(Uuid),
    #[error("Not enough stock for product {0}")]
    InsufficientInventory(Uuid),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
