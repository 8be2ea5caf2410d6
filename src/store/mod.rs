//! Persistence for storefront aggregates.
//!
//! Handlers talk to a [`Store`]; the binary picks [`PgStore`] when a
//! database URL is configured and [`MemoryStore`] otherwise.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, Configuration, ConfigurationError, ConfigurationStatus, Order, Product};
use crate::domain::contact::ContactMessage;
use crate::{Result, StorefrontError};

#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    /// Include draft and archived products (admin listings).
    pub include_inactive: bool,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self { category: None, brand: None, search: None, include_inactive: false, page: 1, per_page: 20 }
    }
}

impl ProductFilter {
    pub fn offset(&self) -> u64 { u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page) }
}

/// Everything written when an order is placed. Stores apply it atomically:
/// inventory for each order line is decremented, failing the whole commit
/// if any product lacks stock.
pub struct OrderCommit<'a> {
    pub order: &'a Order,
    /// Configuration the order came from, already marked as ordered. The
    /// stored copy must still be `confirmed`.
    pub configuration: Option<&'a Configuration>,
    /// Cart the order came from, already cleared. The stored copy must be
    /// the revision the order was built from.
    pub cart: Option<&'a Cart>,
}

/// Error for a configuration write refused because of the stored status.
fn configuration_conflict(stored: Option<ConfigurationStatus>, action: &'static str) -> StorefrontError {
    match stored {
        Some(from) => ConfigurationError::InvalidTransition { from, action }.into(),
        None => StorefrontError::ConfigurationNotFound,
    }
}

fn check_configuration_write(stored: Option<ConfigurationStatus>) -> Result<()> {
    match stored {
        Some(status) if status.is_final() => Err(configuration_conflict(stored, "change")),
        _ => Ok(()),
    }
}

fn check_configuration_completable(stored: Option<ConfigurationStatus>) -> Result<()> {
    match stored {
        Some(ConfigurationStatus::Confirmed) => Ok(()),
        _ => Err(configuration_conflict(stored, "complete")),
    }
}

fn check_cart_write(stored_revision: Option<u64>, cart: &Cart) -> Result<()> {
    if stored_revision.is_some_and(|r| r >= cart.revision()) {
        return Err(CartError::Changed.into());
    }
    Ok(())
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn health_check(&self) -> Result<()>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    /// Inserts or replaces a product, inventory included. SKUs are unique across products.
    async fn save_product(&self, product: &Product) -> Result<()>;
    /// Replaces an existing product's catalog fields but keeps its stored
    /// inventory, so decrements committed since the product was read survive.
    /// Returns the product as stored.
    async fn save_product_details(&self, product: &Product) -> Result<Product>;
    async fn list_brands(&self) -> Result<Vec<String>>;

    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>>;
    /// Fails with a conflict when the stored configuration is already `ordered` or `abandoned`.
    async fn save_configuration(&self, configuration: &Configuration) -> Result<()>;

    async fn next_order_number(&self) -> Result<u64>;
    async fn commit_order(&self, commit: OrderCommit<'_>) -> Result<()>;
    async fn save_order(&self, order: &Order) -> Result<()>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn list_orders_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>>;

    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>>;
    /// Fails with [`CartError::Changed`] unless the cart's revision is newer than the stored one.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    async fn save_contact_message(&self, message: &ContactMessage) -> Result<()>;
}
