use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use super::{check_configuration_completable, check_configuration_write, OrderCommit, ProductFilter, Store};
use crate::domain::aggregates::{Cart, CartError, Configuration, ConfigurationStatus, Order, OrderError, Product};
use crate::domain::contact::ContactMessage;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and runs pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        const WHERE: &str = "WHERE ($1 OR status = 'active') \
            AND ($2::text IS NULL OR category = $2) \
            AND ($3::text IS NULL OR brand = $3) \
            AND ($4::text IS NULL OR sku ILIKE $4 OR doc->'name'->>'en' ILIKE $4 OR doc->'name'->>'ar' ILIKE $4)";
        let search = filter.search.as_deref().map(like_pattern);

        let rows: Vec<Json<Product>> = sqlx::query_scalar(&format!("SELECT doc FROM products {WHERE} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"))
            .bind(filter.include_inactive)
            .bind(&filter.category)
            .bind(&filter.brand)
            .bind(&search)
            .bind(i64::from(filter.per_page))
            .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {WHERE}"))
            .bind(filter.include_inactive)
            .bind(&filter.category)
            .bind(&filter.brand)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(|Json(p)| p).collect(), total))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        let row: Option<Json<Product>> = sqlx::query_scalar("SELECT doc FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(p)| p))
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let rows: Vec<Json<Product>> = sqlx::query_scalar("SELECT doc FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(p)| p).collect())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO products (id, sku, status, brand, category, doc, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             ON CONFLICT (id) DO UPDATE SET sku = $2, status = $3, brand = $4, category = $5, doc = $6, updated_at = NOW()",
        )
        .bind(product.id())
        .bind(product.sku().as_str())
        .bind(product.status().as_str())
        .bind(product.brand())
        .bind(product.category())
        .bind(Json(product))
        .bind(product.created_at())
        .execute(&self.pool)
        .await;
        result.map(|_| ()).map_err(|e| sku_conflict(e, product))
    }

    async fn save_product_details(&self, product: &Product) -> Result<Product> {
        // `doc` on the right-hand side is the locked row, so a concurrent decrement is kept.
        let row: Option<Json<Product>> = sqlx::query_scalar(
            "UPDATE products SET sku = $2, status = $3, brand = $4, category = $5, \
               doc = jsonb_set($6, '{inventory}', doc->'inventory'), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING doc",
        )
        .bind(product.id())
        .bind(product.sku().as_str())
        .bind(product.status().as_str())
        .bind(product.brand())
        .bind(product.category())
        .bind(Json(product))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sku_conflict(e, product))?;
        row.map(|Json(p)| p).ok_or(StorefrontError::ProductNotFound)
    }

    async fn list_brands(&self) -> Result<Vec<String>> {
        let brands: Vec<String> = sqlx::query_scalar("SELECT DISTINCT brand FROM products WHERE status = 'active' AND brand <> '' ORDER BY brand")
            .fetch_all(&self.pool)
            .await?;
        Ok(brands)
    }

    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>> {
        let row: Option<Json<Configuration>> = sqlx::query_scalar("SELECT doc FROM configurations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(c)| c))
    }

    async fn save_configuration(&self, configuration: &Configuration) -> Result<()> {
        let written = sqlx::query(
            "INSERT INTO configurations (id, user_id, product_id, status, doc, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET status = $4, doc = $5, updated_at = $7 \
             WHERE configurations.status NOT IN ('ordered', 'abandoned')",
        )
        .bind(configuration.id())
        .bind(configuration.user_id())
        .bind(configuration.product_id())
        .bind(configuration.status().as_str())
        .bind(Json(configuration))
        .bind(configuration.created_at())
        .bind(configuration.updated_at())
        .execute(&self.pool)
        .await?;
        if written.rows_affected() == 0 {
            let stored = stored_configuration_status(&self.pool, configuration.id()).await?;
            check_configuration_write(stored)?;
            return Err(StorefrontError::StorageError(format!("configuration {} was not written", configuration.id())));
        }
        Ok(())
    }

    async fn next_order_number(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')").fetch_one(&self.pool).await?;
        u64::try_from(n).map_err(|_| StorefrontError::StorageError(format!("order number out of range: {n}")))
    }

    async fn commit_order(&self, commit: OrderCommit<'_>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(configuration) = commit.configuration {
            let ordered = sqlx::query(
                "UPDATE configurations SET status = $2, doc = $3, updated_at = $4 \
                 WHERE id = $1 AND status = 'confirmed'",
            )
            .bind(configuration.id())
            .bind(configuration.status().as_str())
            .bind(Json(configuration))
            .bind(configuration.updated_at())
            .execute(&mut *tx)
            .await?;
            if ordered.rows_affected() == 0 {
                let stored = stored_configuration_status(&mut *tx, configuration.id()).await?;
                check_configuration_completable(stored)?;
                return Err(StorefrontError::StorageError(format!("configuration {} was not written", configuration.id())));
            }
        }
        if let Some(cart) = commit.cart {
            upsert_cart(&mut *tx, cart).await?;
        }

        let mut wanted: HashMap<Uuid, u32> = HashMap::new();
        for line in commit.order.lines() {
            *wanted.entry(line.product_id).or_default() += line.quantity;
        }
        for (id, qty) in wanted {
            let updated = sqlx::query(
                "UPDATE products SET \
                   doc = jsonb_set(jsonb_set(doc, '{inventory}', to_jsonb((doc->>'inventory')::bigint - $2)), '{updated_at}', to_jsonb(NOW())), \
                   updated_at = NOW() \
                 WHERE id = $1 AND (doc->>'inventory')::bigint >= $2",
            )
            .bind(id)
            .bind(i64::from(qty))
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                // Dropping the transaction rolls back decrements already applied.
                return Err(OrderError::InsufficientInventory(id).into());
            }
        }

        upsert_order(&mut *tx, commit.order).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        upsert_order(&self.pool, order).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row: Option<Json<Order>> = sqlx::query_scalar("SELECT doc FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(o)| o))
    }

    async fn list_orders_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>> {
        let rows: Vec<Json<Order>> = sqlx::query_scalar("SELECT doc FROM orders WHERE user_id = $1 ORDER BY order_number DESC LIMIT $2")
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(o)| o).collect())
    }

    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        let row: Option<Json<Cart>> = sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(c)| c))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        upsert_cart(&self.pool, cart).await
    }

    async fn save_contact_message(&self, message: &ContactMessage) -> Result<()> {
        sqlx::query("INSERT INTO contact_messages (id, email, locale, doc, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(message.id)
            .bind(&message.email)
            .bind(message.locale.code())
            .bind(Json(message))
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn sku_conflict(e: sqlx::Error, product: &Product) -> StorefrontError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorefrontError::DuplicateSku(product.sku().to_string()),
        e => e.into(),
    }
}

async fn stored_configuration_status<'e, E>(executor: E, id: Uuid) -> Result<Option<ConfigurationStatus>>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row: Option<Json<Configuration>> = sqlx::query_scalar("SELECT doc FROM configurations WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|Json(c)| c.status()))
}

async fn upsert_order<'e, E>(executor: E, o: &Order) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let order_number = i64::try_from(o.order_number())
        .map_err(|_| StorefrontError::StorageError(format!("order number out of range: {}", o.order_number())))?;
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, status, configuration_id, doc, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (id) DO UPDATE SET status = $4, doc = $6, updated_at = $8",
    )
    .bind(o.id())
    .bind(order_number)
    .bind(o.user_id())
    .bind(o.status().as_str())
    .bind(o.configuration_id())
    .bind(Json(o))
    .bind(o.created_at())
    .bind(o.updated_at())
    .execute(executor)
    .await?;
    Ok(())
}

/// Writes a cart only over an older stored revision.
async fn upsert_cart<'e, E>(executor: E, cart: &Cart) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let revision = i64::try_from(cart.revision())
        .map_err(|_| StorefrontError::StorageError(format!("cart revision out of range: {}", cart.revision())))?;
    let written = sqlx::query(
        "INSERT INTO carts (user_id, revision, doc, updated_at) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id) DO UPDATE SET revision = $2, doc = $3, updated_at = $4 \
         WHERE carts.revision < $2",
    )
    .bind(cart.user_id())
    .bind(revision)
    .bind(Json(cart))
    .bind(cart.updated_at())
    .execute(executor)
    .await?;
    if written.rows_affected() == 0 {
        return Err(CartError::Changed.into());
    }
    Ok(())
}
