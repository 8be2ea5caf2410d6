//! Configuration Aggregate
//!
//! A customer's in-progress customization of one product. It moves
//! `draft -> confirmed -> ordered`; `abandoned` is reachable from the first two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::order::ShippingAddress;
use crate::domain::aggregates::product::Product;
use crate::domain::events::{ConfigurationEvent, DomainEvent};
use crate::domain::pricing::{self, LineQuote, PricingError};
use crate::domain::value_objects::{Selection, SelectionError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    id: Uuid,
    user_id: String,
    product_id: Uuid,
    selection: Selection,
    quantity: u32,
    status: ConfigurationStatus,
    shipping_address: Option<ShippingAddress>,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus { #[default] Draft, Confirmed, Ordered, Abandoned }

impl ConfigurationStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Confirmed => "confirmed", Self::Ordered => "ordered", Self::Abandoned => "abandoned" }
    }

    /// No transition leaves `ordered` or `abandoned`.
    pub fn is_final(&self) -> bool { matches!(self, Self::Ordered | Self::Abandoned) }
}

impl fmt::Display for ConfigurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Configuration {
    pub fn create(user_id: impl Into<String>, product: &Product, selection: &Selection, quantity: u32) -> Result<Self, ConfigurationError> {
        if !product.is_active() { return Err(ConfigurationError::ProductUnavailable); }
        let quantity = pricing::validate_quantity(quantity)?;
        let (selection, _) = product.resolve_selection(selection)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), user_id: user_id.into(), product_id: product.id(), selection, quantity,
            status: ConfigurationStatus::Draft, shipping_address: None, order_id: None,
            created_at: now, updated_at: now, events: vec![],
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn product_id(&self) -> Uuid { self.product_id }
    pub fn selection(&self) -> &Selection { &self.selection }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn status(&self) -> ConfigurationStatus { self.status }
    pub fn shipping_address(&self) -> Option<&ShippingAddress> { self.shipping_address.as_ref() }
    pub fn order_id(&self) -> Option<Uuid> { self.order_id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Price of this configuration at the product's current price and discount.
    pub fn quote(&self, product: &Product) -> Result<LineQuote, ConfigurationError> {
        let (_, input) = product.line_input(&self.selection, self.quantity)?;
        Ok(pricing::quote_line(&input)?)
    }

    pub fn update(&mut self, product: &Product, selection: Option<&Selection>, quantity: Option<u32>) -> Result<(), ConfigurationError> {
        self.require(ConfigurationStatus::Draft, "update")?;
        if let Some(q) = quantity {
            self.quantity = pricing::validate_quantity(q)?;
        }
        if let Some(selection) = selection {
            let (resolved, _) = product.resolve_selection(selection)?;
            self.selection = resolved;
        }
        self.touch();
        Ok(())
    }

    /// Attaches the shipping address. A confirmed configuration may be confirmed again to change it.
    pub fn confirm(&mut self, address: ShippingAddress) -> Result<(), ConfigurationError> {
        if !matches!(self.status, ConfigurationStatus::Draft | ConfigurationStatus::Confirmed) {
            return Err(self.invalid("confirm"));
        }
        self.shipping_address = Some(address);
        self.status = ConfigurationStatus::Confirmed;
        self.touch();
        self.raise_event(DomainEvent::Configuration(ConfigurationEvent::Confirmed { configuration_id: self.id, user_id: self.user_id.clone() }));
        Ok(())
    }

    /// Checks that an order can be created from this configuration.
    pub fn ensure_completable(&self) -> Result<&ShippingAddress, ConfigurationError> {
        self.require(ConfigurationStatus::Confirmed, "complete")?;
        self.shipping_address.as_ref().ok_or(ConfigurationError::MissingAddress)
    }

    pub fn mark_ordered(&mut self, order_id: Uuid) -> Result<(), ConfigurationError> {
        self.ensure_completable()?;
        self.status = ConfigurationStatus::Ordered;
        self.order_id = Some(order_id);
        self.touch();
        self.raise_event(DomainEvent::Configuration(ConfigurationEvent::Ordered { configuration_id: self.id, order_id }));
        Ok(())
    }

    pub fn abandon(&mut self) -> Result<(), ConfigurationError> {
        if !matches!(self.status, ConfigurationStatus::Draft | ConfigurationStatus::Confirmed) {
            return Err(self.invalid("abandon"));
        }
        self.status = ConfigurationStatus::Abandoned;
        self.touch();
        self.raise_event(DomainEvent::Configuration(ConfigurationEvent::Abandoned { configuration_id: self.id }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn require(&self, status: ConfigurationStatus, action: &'static str) -> Result<(), ConfigurationError> {
        if self.status != status { return Err(self.invalid(action)); }
        Ok(())
    }
    fn invalid(&self, action: &'static str) -> ConfigurationError { ConfigurationError::InvalidTransition { from: self.status, action } }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Cannot {action} a configuration that is {from}")]
    InvalidTransition { from: ConfigurationStatus, action: &'static str },
    #[error("Configuration has no shipping address")]
    MissingAddress,
    #[error("Product is not available for configuration")]
    ProductUnavailable,
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
