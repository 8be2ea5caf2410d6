//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::pricing::{self, PricingError};
use crate::domain::value_objects::Selection;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    user_id: String,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Bumped on every change; stores refuse a write that does not build on the stored revision.
    #[serde(default)]
    revision: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub selection: Selection,
    pub quantity: u32,
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { user_id: user_id.into(), items: vec![], created_at: now, updated_at: now, revision: 0 }
    }

    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn unit_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn revision(&self) -> u64 { self.revision }

    /// Adds a line, merging it into an existing line with the same product and selection.
    /// The selection must already be resolved against the product.
    pub fn add_item(&mut self, product_id: Uuid, selection: Selection, quantity: u32) -> Result<&CartItem, CartError> {
        pricing::validate_quantity(quantity)?;
        let idx = match self.items.iter().position(|i| i.product_id == product_id && i.selection == selection) {
            Some(idx) => {
                let merged = pricing::validate_quantity(self.items[idx].quantity.saturating_add(quantity))?;
                self.items[idx].quantity = merged;
                idx
            }
            None => {
                self.items.push(CartItem { id: Uuid::now_v7(), product_id, selection, quantity });
                self.items.len() - 1
            }
        };
        self.touch();
        Ok(&self.items[idx])
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, item_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return self.remove_item(item_id); }
        pricing::validate_quantity(quantity)?;
        let item = self.items.iter_mut().find(|i| i.id == item_id).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.revision += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found")]
    ItemNotFound,
    #[error("Cart is empty")]
    Empty,
    #[error("Cart was changed by another request")]
    Changed,
    #[error(transparent)]
    Pricing(#[from] PricingError),
}
