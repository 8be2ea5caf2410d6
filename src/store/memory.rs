use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{check_cart_write, check_configuration_completable, check_configuration_write, OrderCommit, ProductFilter, Store};
use crate::domain::aggregates::{Cart, Configuration, Order, OrderError, Product};
use crate::domain::contact::ContactMessage;
use crate::{Result, StorefrontError};

const FIRST_ORDER_NUMBER: u64 = 1000;

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    configurations: HashMap<Uuid, Configuration>,
    orders: HashMap<Uuid, Order>,
    carts: HashMap<String, Cart>,
    contact_messages: Vec<ContactMessage>,
}

/// Process-local store used for development and tests.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    order_numbers: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { tables: RwLock::new(Tables::default()), order_numbers: AtomicU64::new(FIRST_ORDER_NUMBER) }
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn contact_messages(&self) -> Vec<ContactMessage> {
        self.tables.read().await.contact_messages.clone()
    }
}

fn check_unique_sku(tables: &Tables, product: &Product) -> Result<()> {
    if tables.products.values().any(|p| p.sku() == product.sku() && p.id() != product.id()) {
        return Err(StorefrontError::DuplicateSku(product.sku().to_string()));
    }
    Ok(())
}

fn is_listed(product: &Product, filter: &ProductFilter) -> bool {
    (filter.include_inactive || product.is_active())
        && filter.category.as_deref().map_or(true, |c| product.category() == c)
        && filter.brand.as_deref().map_or(true, |b| product.brand() == b)
        && filter.search.as_deref().map_or(true, |q| {
            product.name().contains_ignore_case(q) || product.sku().as_str().contains(&q.to_uppercase())
        })
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<()> { Ok(()) }

    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        let tables = self.tables.read().await;
        let mut found: Vec<&Product> = tables.products.values().filter(|p| is_listed(p, filter)).collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        let total = found.len() as i64;
        let page = found
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.per_page as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        check_unique_sku(&tables, product)?;
        tables.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn save_product_details(&self, product: &Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        check_unique_sku(&tables, product)?;
        let stored = tables.products.get(&product.id()).ok_or(StorefrontError::ProductNotFound)?;
        let mut merged = product.clone();
        merged.keep_inventory_of(stored);
        tables.products.insert(merged.id(), merged.clone());
        Ok(merged)
    }

    async fn list_brands(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let brands: BTreeSet<String> = tables
            .products
            .values()
            .filter(|p| p.is_active() && !p.brand().is_empty())
            .map(|p| p.brand().to_owned())
            .collect();
        Ok(brands.into_iter().collect())
    }

    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>> {
        Ok(self.tables.read().await.configurations.get(&id).cloned())
    }

    async fn save_configuration(&self, configuration: &Configuration) -> Result<()> {
        let mut tables = self.tables.write().await;
        check_configuration_write(tables.configurations.get(&configuration.id()).map(Configuration::status))?;
        tables.configurations.insert(configuration.id(), configuration.clone());
        Ok(())
    }

    async fn next_order_number(&self) -> Result<u64> {
        Ok(self.order_numbers.fetch_add(1, Ordering::SeqCst))
    }

    async fn commit_order(&self, commit: OrderCommit<'_>) -> Result<()> {
        let mut tables = self.tables.write().await;

        if let Some(configuration) = commit.configuration {
            check_configuration_completable(tables.configurations.get(&configuration.id()).map(Configuration::status))?;
        }
        if let Some(cart) = commit.cart {
            check_cart_write(tables.carts.get(cart.user_id()).map(Cart::revision), cart)?;
        }

        let mut wanted: HashMap<Uuid, u32> = HashMap::new();
        for line in commit.order.lines() {
            *wanted.entry(line.product_id).or_default() += line.quantity;
        }
        for (id, qty) in &wanted {
            let product = tables.products.get(id).ok_or(StorefrontError::ProductNotFound)?;
            if product.inventory().value() < *qty {
                return Err(OrderError::InsufficientInventory(*id).into());
            }
        }
        for (id, qty) in wanted {
            if let Some(product) = tables.products.get_mut(&id) {
                product.remove_inventory(qty)?;
            }
        }

        tables.orders.insert(commit.order.id(), commit.order.clone());
        if let Some(configuration) = commit.configuration {
            tables.configurations.insert(configuration.id(), configuration.clone());
        }
        if let Some(cart) = commit.cart {
            tables.carts.insert(cart.user_id().to_owned(), cart.clone());
        }
        Ok(())
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        self.tables.write().await.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().filter(|o| o.user_id() == user_id).cloned().collect();
        orders.sort_by(|a, b| b.order_number().cmp(&a.order_number()));
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        Ok(self.tables.read().await.carts.get(user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tables = self.tables.write().await;
        check_cart_write(tables.carts.get(cart.user_id()).map(Cart::revision), cart)?;
        tables.carts.insert(cart.user_id().to_owned(), cart.clone());
        Ok(())
    }

    async fn save_contact_message(&self, message: &ContactMessage) -> Result<()> {
        self.tables.write().await.contact_messages.push(message.clone());
        Ok(())
    }
}
