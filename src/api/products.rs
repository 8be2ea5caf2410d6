use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AdminUser, CurrentUser, RequestLocale};
use super::{AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{Product, ProductOptions, ProductStatus, ProductUpdate};
use crate::domain::pricing::{self, Discount, OrderQuote};
use crate::domain::value_objects::{LocalizedText, Selection, Sku};
use crate::i18n::{Locale, TextDirection};
use crate::store::ProductFilter;
use crate::{Result, StorefrontError};

#[derive(Debug, Serialize)]
pub(super) struct PriceDisplay {
    currency: String,
    price: Decimal,
    discounted_price: Decimal,
    discount_percent: Decimal,
    has_discount: bool,
}

impl PriceDisplay {
    fn of(product: &Product, currency: &str) -> Result<Self> {
        Ok(Self {
            currency: currency.to_owned(),
            price: product.price(),
            discounted_price: pricing::discounted_unit_price(product.price(), product.discount())?,
            discount_percent: product.discount().as_percent(),
            has_discount: !product.discount().is_none(),
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProductView {
    id: Uuid,
    sku: String,
    name: String,
    description: String,
    brand: String,
    category: String,
    images: Vec<String>,
    status: ProductStatus,
    in_stock: bool,
    inventory: u32,
    pricing: PriceDisplay,
    options: ProductOptions,
    locale: Locale,
    direction: TextDirection,
}

impl ProductView {
    pub(super) fn build(product: &Product, locale: Locale, currency: &str) -> Result<Self> {
        Ok(Self {
            id: product.id(),
            sku: product.sku().to_string(),
            name: product.name().get(locale).to_owned(),
            description: product.description().get(locale).to_owned(),
            brand: product.brand().to_owned(),
            category: product.category().to_owned(),
            images: product.images().to_vec(),
            status: product.status(),
            in_stock: product.is_in_stock(),
            inventory: product.inventory().value(),
            pricing: PriceDisplay::of(product, currency)?,
            options: product.options().clone(),
            locale,
            direction: locale.direction(),
        })
    }
}

/// Loads a product that customers may see; drafts and archived products are visible to admins only.
pub(super) async fn load_visible(s: &AppState, id: Uuid, user: Option<&CurrentUser>) -> Result<Product> {
    let product = s.store.get_product(id).await?.ok_or(StorefrontError::ProductNotFound)?;
    if !product.is_active() && !user.is_some_and(CurrentUser::is_admin) {
        return Err(StorefrontError::ProductNotFound);
    }
    Ok(product)
}

pub(super) async fn list_products(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: Option<CurrentUser>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ProductView>>> {
    let filter = ProductFilter {
        category: p.category.clone().filter(|c| !c.is_empty()),
        brand: p.brand.clone().filter(|b| !b.is_empty()),
        search: p.search.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(str::to_owned),
        include_inactive: p.all && user.as_ref().is_some_and(CurrentUser::is_admin),
        page: p.page(),
        per_page: p.per_page(),
    };
    let (products, total) = s.store.list_products(&filter).await?;
    let data = products
        .iter()
        .map(|product| ProductView::build(product, locale, &s.config.currency))
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(PaginatedResponse { data, total, page: filter.page, per_page: filter.per_page }))
}

pub(super) async fn get_product(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductView>> {
    let product = load_visible(&s, id, user.as_ref()).await?;
    Ok(Json(ProductView::build(&product, locale, &s.config.currency)?))
}

pub(super) async fn list_brands(State(s): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(s.store.list_brands().await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct QuoteRequest {
    #[serde(default)]
    selection: Selection,
    quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct QuoteView {
    product_id: Uuid,
    currency: String,
    selection: Selection,
    quote: OrderQuote,
}

/// Price of a prospective configuration, shipping included.
pub(super) async fn quote_product(
    State(s): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(r): Json<QuoteRequest>,
) -> Result<Json<QuoteView>> {
    let product = load_visible(&s, id, user.as_ref()).await?;
    let (selection, input) = product.line_input(&r.selection, r.quantity)?;
    let quote = pricing::quote_order(&[input], s.config.shipping_fee)?;
    Ok(Json(QuoteView { product_id: id, currency: s.config.currency.clone(), selection, quote }))
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateProductRequest {
    sku: String,
    name: LocalizedText,
    #[serde(default)]
    description: LocalizedText,
    #[validate(length(min = 1, max = 80))]
    brand: String,
    #[validate(length(min = 1, max = 80))]
    category: String,
    price: Decimal,
    #[serde(default)]
    discount_percent: Decimal,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    options: ProductOptions,
    #[serde(default)]
    inventory: u32,
    #[serde(default)]
    publish: bool,
}

pub(super) async fn create_product(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductView>)> {
    r.validate()?;
    let mut product = Product::create(Sku::new(r.sku)?, r.name, r.brand, r.category, r.price)?;
    product.apply(ProductUpdate {
        description: Some(r.description),
        discount: Some(Discount::percent(r.discount_percent)?),
        images: Some(r.images),
        options: Some(r.options),
        inventory: Some(r.inventory),
        ..Default::default()
    })?;
    if r.publish {
        product.publish()?;
    }
    s.store.save_product(&product).await?;
    tracing::info!(product_id = %product.id(), sku = %product.sku(), admin = %admin.id, "product created");
    s.events.publish(product.take_events()).await;
    Ok((StatusCode::CREATED, Json(ProductView::build(&product, s.config.default_locale, &s.config.currency)?)))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(super) struct UpdateProductRequest {
    name: Option<LocalizedText>,
    description: Option<LocalizedText>,
    #[validate(length(min = 1, max = 80))]
    brand: Option<String>,
    #[validate(length(min = 1, max = 80))]
    category: Option<String>,
    price: Option<Decimal>,
    discount_percent: Option<Decimal>,
    images: Option<Vec<String>>,
    options: Option<ProductOptions>,
    inventory: Option<u32>,
}

pub(super) async fn update_product(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProductRequest>,
) -> Result<Json<ProductView>> {
    r.validate()?;
    let mut product = s.store.get_product(id).await?.ok_or(StorefrontError::ProductNotFound)?;
    let sets_inventory = r.inventory.is_some();
    product.apply(ProductUpdate {
        name: r.name,
        description: r.description,
        brand: r.brand,
        category: r.category,
        price: r.price,
        discount: r.discount_percent.map(Discount::percent).transpose()?,
        images: r.images,
        options: r.options,
        inventory: r.inventory,
    })?;
    // An explicit stock count replaces inventory; any other edit leaves it to order commits.
    let product = if sets_inventory {
        s.store.save_product(&product).await?;
        product
    } else {
        s.store.save_product_details(&product).await?
    };
    tracing::info!(product_id = %id, admin = %admin.id, inventory = product.inventory().value(), "product updated");
    Ok(Json(ProductView::build(&product, locale, &s.config.currency)?))
}

pub(super) async fn publish_product(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductView>> {
    let mut product = s.store.get_product(id).await?.ok_or(StorefrontError::ProductNotFound)?;
    product.publish()?;
    let stored = s.store.save_product_details(&product).await?;
    tracing::info!(product_id = %id, admin = %admin.id, "product published");
    s.events.publish(product.take_events()).await;
    Ok(Json(ProductView::build(&stored, locale, &s.config.currency)?))
}

pub(super) async fn archive_product(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut product = s.store.get_product(id).await?.ok_or(StorefrontError::ProductNotFound)?;
    product.archive();
    s.store.save_product_details(&product).await?;
    tracing::info!(product_id = %id, admin = %admin.id, "product archived");
    s.events.publish(product.take_events()).await;
    Ok(StatusCode::NO_CONTENT)
}
