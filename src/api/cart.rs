use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::configurations::inventory_events;
use super::extract::{CurrentUser, RequestLocale};
use super::orders::OrderView;
use super::products::load_visible;
use super::AppState;
use crate::domain::aggregates::{Cart, CartError, Order, OrderItem, Product, ShippingAddress};
use crate::domain::pricing::{self, LineQuote};
use crate::domain::value_objects::Selection;
use crate::i18n::{self, Locale, TextDirection};
use crate::store::OrderCommit;
use crate::{Result, StorefrontError};

#[derive(Debug, Serialize)]
struct CartLineView {
    id: Uuid,
    product_id: Uuid,
    sku: Option<String>,
    name: Option<String>,
    image: Option<String>,
    selection: Selection,
    quantity: u32,
    /// False when the product was archived or its options changed; such lines are left out of totals.
    available: bool,
    quote: Option<LineQuote>,
}

#[derive(Debug, Serialize)]
pub(super) struct CartView {
    items: Vec<CartLineView>,
    item_count: usize,
    unit_count: u32,
    currency: String,
    subtotal: Decimal,
    shipping: Decimal,
    savings: Decimal,
    total: Decimal,
    /// Localized notice when the cart has nothing to check out.
    empty_message: Option<String>,
    locale: Locale,
    direction: TextDirection,
}

async fn load_cart(s: &AppState, user: &CurrentUser) -> Result<Cart> {
    Ok(s.store.get_cart(&user.id).await?.unwrap_or_else(|| Cart::new(&user.id)))
}

async fn products_for(s: &AppState, cart: &Cart) -> Result<HashMap<Uuid, Product>> {
    let mut ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(s.store.get_products(&ids).await?.into_iter().map(|p| (p.id(), p)).collect())
}

async fn build_view(s: &AppState, cart: &Cart, locale: Locale) -> Result<CartView> {
    let products = products_for(s, cart).await?;
    let mut quotes = Vec::new();
    let items = cart
        .items()
        .iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            let quote = product
                .filter(|p| p.is_active())
                .and_then(|p| p.line_input(&item.selection, item.quantity).ok())
                .and_then(|(_, input)| pricing::quote_line(&input).ok());
            if let Some(q) = &quote {
                quotes.push(q.clone());
            }
            CartLineView {
                id: item.id,
                product_id: item.product_id,
                sku: product.map(|p| p.sku().to_string()),
                name: product.map(|p| p.name().get(locale).to_owned()),
                image: product.and_then(|p| p.images().first().cloned()),
                selection: item.selection.clone(),
                quantity: item.quantity,
                available: quote.is_some(),
                quote,
            }
        })
        .collect::<Vec<_>>();

    let shipping = if quotes.is_empty() { Decimal::ZERO } else { s.config.shipping_fee };
    let totals = pricing::summarize(quotes, shipping)?;
    Ok(CartView {
        item_count: cart.item_count(),
        unit_count: cart.unit_count(),
        items,
        currency: s.config.currency.clone(),
        subtotal: totals.subtotal,
        shipping: totals.shipping,
        savings: totals.savings,
        total: totals.total,
        empty_message: cart.is_empty().then(|| i18n::t(locale, "cart.empty")),
        locale,
        direction: locale.direction(),
    })
}

pub(super) async fn get_cart(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
) -> Result<Json<CartView>> {
    let cart = load_cart(&s, &user).await?;
    Ok(Json(build_view(&s, &cart, locale).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    product_id: Uuid,
    #[serde(default)]
    selection: Selection,
    quantity: u32,
}

pub(super) async fn add_item(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Json(r): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    // Carts only hold purchasable products, for admins too.
    let product = load_visible(&s, r.product_id, None).await?;
    let (selection, _) = product.resolve_selection(&r.selection)?;
    let mut cart = load_cart(&s, &user).await?;
    cart.add_item(product.id(), selection, r.quantity)?;
    s.store.save_cart(&cart).await?;
    tracing::debug!(user_id = %user.id, product_id = %product.id(), quantity = r.quantity, "cart item added");
    Ok((StatusCode::CREATED, Json(build_view(&s, &cart, locale).await?)))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateItemRequest {
    quantity: u32,
}

pub(super) async fn update_item(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&s, &user).await?;
    cart.update_quantity(item_id, r.quantity)?;
    s.store.save_cart(&cart).await?;
    Ok(Json(build_view(&s, &cart, locale).await?))
}

pub(super) async fn remove_item(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&s, &user).await?;
    cart.remove_item(item_id)?;
    s.store.save_cart(&cart).await?;
    Ok(Json(build_view(&s, &cart, locale).await?))
}

pub(super) async fn clear_cart(State(s): State<AppState>, user: CurrentUser) -> Result<StatusCode> {
    let mut cart = load_cart(&s, &user).await?;
    cart.clear();
    s.store.save_cart(&cart).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutRequest {
    shipping_address: ShippingAddress,
}

/// Turns the cart into an order: one line per cart item, then empties the cart.
pub(super) async fn checkout(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderView>)> {
    r.shipping_address.validate()?;
    let mut cart = load_cart(&s, &user).await?;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }
    let products = products_for(&s, &cart).await?;
    let items = cart
        .items()
        .iter()
        .map(|item| {
            let product = products.get(&item.product_id).ok_or(StorefrontError::ProductNotFound)?;
            Ok(OrderItem { product, selection: &item.selection, quantity: item.quantity })
        })
        .collect::<Result<Vec<_>>>()?;

    let order_number = s.store.next_order_number().await?;
    let mut order = Order::place(order_number, &user.id, &items, r.shipping_address, s.config.shipping_fee, &s.config.currency)?;
    cart.clear();

    s.store.commit_order(OrderCommit { order: &order, configuration: None, cart: Some(&cart) }).await?;
    tracing::info!(order_id = %order.id(), order_number, user_id = %user.id, lines = order.lines().len(), total = %order.total(), "order placed from cart");

    let mut events = order.take_events();
    events.extend(inventory_events(&order));
    s.events.publish(events).await;
    Ok((StatusCode::CREATED, Json(OrderView::build(&order, locale))))
}
