//! Lighting Storefront
//!
//! Bilingual (Arabic/English) storefront service for a lighting retailer.
//!
//! ## Features
//! - Product catalog with configurable options (color temperature, IP rating, wattage)
//! - Order configurations: draft, preview, confirm, complete
//! - Shopping cart and checkout
//! - Order lifecycle
//! - Localized messages and marketing pages

pub mod api;
pub mod config;
pub mod domain;
pub mod events;
pub mod i18n;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::{CartError, ConfigurationError, OrderError, ProductError};
use crate::domain::pricing::PricingError;
use crate::domain::value_objects::{SelectionError, SkuError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Configuration not found")]
    ConfigurationNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Page not found")]
    PageNotFound,

    #[error("A product with SKU {0} already exists")]
    DuplicateSku(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not allowed")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Sku(#[from] SkuError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
