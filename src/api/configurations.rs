//! Configuration flow: create a draft, preview it, confirm shipping details, complete into an order.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::extract::{CurrentUser, RequestLocale};
use super::orders::OrderView;
use super::products::load_visible;
use super::AppState;
use crate::domain::aggregates::{Configuration, ConfigurationStatus, Order, OrderItem, Product, ShippingAddress};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::pricing::{self, OrderQuote};
use crate::domain::value_objects::Selection;
use crate::i18n::{Locale, TextDirection};
use crate::store::OrderCommit;
use crate::{Result, StorefrontError};

#[derive(Debug, Serialize)]
struct ProductSummary {
    id: Uuid,
    sku: String,
    name: String,
    image: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ConfigurationView {
    id: Uuid,
    status: ConfigurationStatus,
    product: ProductSummary,
    selection: Selection,
    quantity: u32,
    shipping_address: Option<ShippingAddress>,
    order_id: Option<Uuid>,
    currency: String,
    /// Priced at the product's current price; the order keeps its own snapshot once completed.
    quote: OrderQuote,
    locale: Locale,
    direction: TextDirection,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

async fn build_view(s: &AppState, c: &Configuration, locale: Locale) -> Result<ConfigurationView> {
    let product = s.store.get_product(c.product_id()).await?.ok_or(StorefrontError::ProductNotFound)?;
    view(s, c, &product, locale)
}

fn view(s: &AppState, c: &Configuration, product: &Product, locale: Locale) -> Result<ConfigurationView> {
    let quote = pricing::summarize(vec![c.quote(product)?], s.config.shipping_fee)?;
    Ok(ConfigurationView {
        id: c.id(),
        status: c.status(),
        product: ProductSummary {
            id: product.id(),
            sku: product.sku().to_string(),
            name: product.name().get(locale).to_owned(),
            image: product.images().first().cloned(),
        },
        selection: c.selection().clone(),
        quantity: c.quantity(),
        shipping_address: c.shipping_address().cloned(),
        order_id: c.order_id(),
        currency: s.config.currency.clone(),
        quote,
        locale,
        direction: locale.direction(),
        created_at: c.created_at(),
        updated_at: c.updated_at(),
    })
}

/// Loads a configuration owned by the caller. Other users' configurations are reported as missing.
async fn load_owned(s: &AppState, id: Uuid, user: &CurrentUser) -> Result<Configuration> {
    let c = s.store.get_configuration(id).await?.ok_or(StorefrontError::ConfigurationNotFound)?;
    if !user.can_access(c.user_id()) {
        return Err(StorefrontError::ConfigurationNotFound);
    }
    Ok(c)
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateConfigurationRequest {
    product_id: Uuid,
    #[serde(default)]
    selection: Selection,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 { 1 }

pub(super) async fn create_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Json(r): Json<CreateConfigurationRequest>,
) -> Result<(StatusCode, Json<ConfigurationView>)> {
    let product = load_visible(&s, r.product_id, Some(&user)).await?;
    let configuration = Configuration::create(&user.id, &product, &r.selection, r.quantity)?;
    // Priced before saving so an unpriceable configuration is never stored.
    let view = view(&s, &configuration, &product, locale)?;
    s.store.save_configuration(&configuration).await?;
    tracing::info!(configuration_id = %configuration.id(), product_id = %product.id(), user_id = %user.id, "configuration created");
    Ok((StatusCode::CREATED, Json(view)))
}

pub(super) async fn preview_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfigurationView>> {
    let configuration = load_owned(&s, id, &user).await?;
    Ok(Json(build_view(&s, &configuration, locale).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateConfigurationRequest {
    selection: Option<Selection>,
    quantity: Option<u32>,
}

pub(super) async fn update_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateConfigurationRequest>,
) -> Result<Json<ConfigurationView>> {
    let mut configuration = load_owned(&s, id, &user).await?;
    let product = s.store.get_product(configuration.product_id()).await?.ok_or(StorefrontError::ProductNotFound)?;
    configuration.update(&product, r.selection.as_ref(), r.quantity)?;
    let view = view(&s, &configuration, &product, locale)?;
    s.store.save_configuration(&configuration).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub(super) struct ConfirmRequest {
    shipping_address: ShippingAddress,
}

pub(super) async fn confirm_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(r): Json<ConfirmRequest>,
) -> Result<Json<ConfigurationView>> {
    r.shipping_address.validate()?;
    let mut configuration = load_owned(&s, id, &user).await?;
    configuration.confirm(r.shipping_address)?;
    s.store.save_configuration(&configuration).await?;
    tracing::info!(configuration_id = %id, user_id = %user.id, "configuration confirmed");
    s.events.publish(configuration.take_events()).await;
    Ok(Json(build_view(&s, &configuration, locale).await?))
}

pub(super) async fn complete_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let mut configuration = load_owned(&s, id, &user).await?;
    let address = configuration.ensure_completable()?.clone();
    let product = s.store.get_product(configuration.product_id()).await?.ok_or(StorefrontError::ProductNotFound)?;

    let order_number = s.store.next_order_number().await?;
    let item = OrderItem { product: &product, selection: configuration.selection(), quantity: configuration.quantity() };
    let mut order = Order::place(order_number, configuration.user_id(), &[item], address, s.config.shipping_fee, &s.config.currency)?
        .with_configuration(configuration.id());
    configuration.mark_ordered(order.id())?;

    s.store.commit_order(OrderCommit { order: &order, configuration: Some(&configuration), cart: None }).await?;
    tracing::info!(order_id = %order.id(), order_number, configuration_id = %id, total = %order.total(), "order placed from configuration");

    let mut events = order.take_events();
    events.extend(configuration.take_events());
    events.extend(inventory_events(&order));
    s.events.publish(events).await;
    Ok((StatusCode::CREATED, Json(OrderView::build(&order, locale))))
}

pub(super) async fn abandon_configuration(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfigurationView>> {
    let mut configuration = load_owned(&s, id, &user).await?;
    configuration.abandon()?;
    s.store.save_configuration(&configuration).await?;
    s.events.publish(configuration.take_events()).await;
    Ok(Json(build_view(&s, &configuration, locale).await?))
}

pub(super) fn inventory_events(order: &Order) -> Vec<DomainEvent> {
    order
        .lines()
        .iter()
        .map(|l| DomainEvent::Product(ProductEvent::InventoryRemoved { product_id: l.product_id, quantity: l.quantity }))
        .collect()
}
