//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::pricing::{Discount, LineInput, MAX_PRICE};
use crate::domain::value_objects::{
    ColorTemperature, IpRating, LocalizedText, PricedOption, Quantity, Selection, SelectionError, Sku,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    sku: Sku,
    name: LocalizedText,
    description: LocalizedText,
    brand: String,
    category: String,
    price: Decimal,
    discount: Discount,
    inventory: Quantity,
    status: ProductStatus,
    images: Vec<String>,
    options: ProductOptions,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Configurable options a product offers. An empty list means the option does not apply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOptions {
    #[serde(default)]
    pub color_temperatures: Vec<PricedOption<ColorTemperature>>,
    #[serde(default)]
    pub ip_ratings: Vec<PricedOption<IpRating>>,
    #[serde(default)]
    pub wattages: Vec<PricedOption<u32>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Active => "active", Self::Archived => "archived" }
    }
}

/// Editable catalog fields. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Discount>,
    pub images: Option<Vec<String>>,
    pub options: Option<ProductOptions>,
    pub inventory: Option<u32>,
}

impl Product {
    pub fn create(sku: Sku, name: LocalizedText, brand: impl Into<String>, category: impl Into<String>, price: Decimal) -> Result<Self, ProductError> {
        let price = check_price(price)?;
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut product = Self {
            id, sku: sku.clone(), name, description: LocalizedText::default(),
            brand: brand.into(), category: category.into(), price, discount: Discount::NONE,
            inventory: Quantity::default(), status: ProductStatus::Draft, images: vec![],
            options: ProductOptions::default(), created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, sku }));
        Ok(product)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &LocalizedText { &self.name }
    pub fn description(&self) -> &LocalizedText { &self.description }
    pub fn brand(&self) -> &str { &self.brand }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> Decimal { self.price }
    pub fn discount(&self) -> Discount { self.discount }
    pub fn inventory(&self) -> Quantity { self.inventory }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn options(&self) -> &ProductOptions { &self.options }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_active(&self) -> bool { self.status == ProductStatus::Active }
    pub fn is_in_stock(&self) -> bool { !self.inventory.is_zero() }

    pub fn apply(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        if let Some(price) = update.price { check_price(price)?; }
        if let Some(options) = &update.options { options.validate()?; }
        if let Some(price) = update.price { self.price = price; }
        if let Some(name) = update.name { self.name = name; }
        if let Some(description) = update.description { self.description = description; }
        if let Some(brand) = update.brand { self.brand = brand; }
        if let Some(category) = update.category { self.category = category; }
        if let Some(discount) = update.discount { self.discount = discount; }
        if let Some(images) = update.images { self.images = images; }
        if let Some(options) = update.options { self.options = options; }
        if let Some(inventory) = update.inventory { self.inventory = Quantity::new(inventory); }
        self.touch();
        Ok(())
    }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.en.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.status == ProductStatus::Active { return Ok(()); }
        self.status = ProductStatus::Active;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Published { product_id: self.id }));
        Ok(())
    }

    pub fn archive(&mut self) {
        if self.status == ProductStatus::Archived { return; }
        self.status = ProductStatus::Archived;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Archived { product_id: self.id }));
    }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.inventory = self.inventory.subtract(qty).ok_or(ProductError::InsufficientInventory)?;
        self.touch();
        Ok(())
    }

    pub(crate) fn keep_inventory_of(&mut self, stored: &Product) { self.inventory = stored.inventory; }

    /// Checks a selection against the offered options and fills unset choices with the first
    /// offered value. Returns the completed selection and its per-unit surcharge.
    pub fn resolve_selection(&self, selection: &Selection) -> Result<(Selection, Decimal), SelectionError> {
        let (color_temperature, ct_extra) = pick(&self.options.color_temperatures, selection.color_temperature)
            .map_err(SelectionError::ColorTemperatureUnavailable)?;
        let (ip_rating, ip_extra) = pick(&self.options.ip_ratings, selection.ip_rating)
            .map_err(SelectionError::IpRatingUnavailable)?;
        let (wattage, w_extra) = pick(&self.options.wattages, selection.wattage)
            .map_err(SelectionError::WattageUnavailable)?;
        // Saturates so an out-of-range stored surcharge surfaces as a pricing error.
        let surcharge = ct_extra.saturating_add(ip_extra).saturating_add(w_extra);
        Ok((Selection { color_temperature, ip_rating, wattage }, surcharge))
    }

    /// Pricing input for `quantity` units of this product in the given selection.
    pub fn line_input(&self, selection: &Selection, quantity: u32) -> Result<(Selection, LineInput), SelectionError> {
        let (selection, surcharge) = self.resolve_selection(selection)?;
        Ok((selection, LineInput { unit_price: self.price, discount: self.discount, surcharge, quantity }))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl ProductOptions {
    pub fn validate(&self) -> Result<(), ProductError> {
        check_offered(&self.color_temperatures)?;
        check_offered(&self.ip_ratings)?;
        check_offered(&self.wattages)
    }
}

fn check_price(price: Decimal) -> Result<Decimal, ProductError> {
    if price.is_sign_negative() { return Err(ProductError::NegativePrice); }
    if price > MAX_PRICE { return Err(ProductError::PriceTooHigh(price)); }
    Ok(price)
}

fn check_offered<T: PartialEq + std::fmt::Debug>(offered: &[PricedOption<T>]) -> Result<(), ProductError> {
    for (i, option) in offered.iter().enumerate() {
        if option.price_increase < Decimal::ZERO || option.price_increase > MAX_PRICE {
            return Err(ProductError::InvalidSurcharge(option.price_increase));
        }
        if offered[..i].iter().any(|o| o.value == option.value) {
            return Err(ProductError::DuplicateOption(format!("{:?}", option.value)));
        }
    }
    Ok(())
}

fn pick<T: Copy + PartialEq>(offered: &[PricedOption<T>], chosen: Option<T>) -> Result<(Option<T>, Decimal), T> {
    match chosen {
        Some(value) => offered
            .iter()
            .find(|o| o.value == value)
            .map(|o| (Some(o.value), o.price_increase))
            .ok_or(value),
        None => Ok(offered.first().map_or((None, Decimal::ZERO), |o| (Some(o.value), o.price_increase))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Product needs an English name before it can be published")]
    MissingName,
    #[error("Insufficient inventory")]
    InsufficientInventory,
    #[error("Price must not be negative")]
    NegativePrice,
    #[error("Price {0} exceeds the maximum of {max}", max = MAX_PRICE)]
    PriceTooHigh(Decimal),
    #[error("Option price increase must be between 0 and {max}, got {0}", max = MAX_PRICE)]
    InvalidSurcharge(Decimal),
    #[error("Option value {0} is offered more than once")]
    DuplicateOption(String),
    #[error("Product is not available for sale")]
    Unavailable,
}
