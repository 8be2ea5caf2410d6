use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{AdminUser, CurrentUser, RequestLocale};
use super::AppState;
use crate::domain::aggregates::{Order, OrderError, OrderStatus, PaymentStatus, ShippingAddress};
use crate::domain::value_objects::Selection;
use crate::i18n::{self, Locale, TextDirection};
use crate::{Result, StorefrontError};

#[derive(Debug, Serialize)]
struct OrderLineView {
    product_id: Uuid,
    sku: String,
    name: String,
    selection: Selection,
    quantity: u32,
    unit_price: Decimal,
    discount_percent: Decimal,
    discounted_unit_price: Decimal,
    surcharge: Decimal,
    line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderView {
    id: Uuid,
    order_number: u64,
    status: OrderStatus,
    status_label: String,
    payment_status: PaymentStatus,
    lines: Vec<OrderLineView>,
    currency: String,
    subtotal: Decimal,
    shipping: Decimal,
    savings: Decimal,
    total: Decimal,
    shipping_address: ShippingAddress,
    configuration_id: Option<Uuid>,
    /// Localized confirmation shown on the thank-you page.
    message: String,
    locale: Locale,
    direction: TextDirection,
    created_at: DateTime<Utc>,
}

impl OrderView {
    pub(super) fn build(order: &Order, locale: Locale) -> Self {
        let lines = order
            .lines()
            .iter()
            .map(|l| OrderLineView {
                product_id: l.product_id,
                sku: l.sku.to_string(),
                name: l.name.get(locale).to_owned(),
                selection: l.selection.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                discount_percent: l.discount_percent,
                discounted_unit_price: l.discounted_unit_price,
                surcharge: l.surcharge,
                line_total: l.line_total,
            })
            .collect();
        let number = order.order_number().to_string();
        Self {
            id: order.id(),
            order_number: order.order_number(),
            status: order.status(),
            status_label: i18n::t(locale, &format!("orders.status.{}", order.status().as_str())),
            payment_status: order.payment_status(),
            lines,
            currency: order.currency().to_owned(),
            subtotal: order.subtotal().amount(),
            shipping: order.shipping().amount(),
            savings: order.savings().amount(),
            total: order.total().amount(),
            shipping_address: order.shipping_address().clone(),
            configuration_id: order.configuration_id(),
            message: i18n::t_with(locale, "orders.thank_you", &[("number", &number)]),
            locale,
            direction: locale.direction(),
            created_at: order.created_at(),
        }
    }
}

async fn load_order(s: &AppState, id: Uuid, user: &CurrentUser) -> Result<Order> {
    let order = s.store.get_order(id).await?.ok_or(StorefrontError::OrderNotFound)?;
    if !user.can_access(order.user_id()) {
        return Err(StorefrontError::OrderNotFound);
    }
    Ok(order)
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderListParams {
    limit: Option<i64>,
}

pub(super) async fn list_orders(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Query(p): Query<OrderListParams>,
) -> Result<Json<Vec<OrderView>>> {
    let orders = s.store.list_orders_for_user(&user.id, p.limit.unwrap_or(50).clamp(1, 200)).await?;
    Ok(Json(orders.iter().map(|o| OrderView::build(o, locale)).collect()))
}

pub(super) async fn get_order(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    let order = load_order(&s, id, &user).await?;
    Ok(Json(OrderView::build(&order, locale)))
}

pub(super) async fn cancel_order(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    let mut order = load_order(&s, id, &user).await?;
    order.cancel()?;
    s.store.save_order(&order).await?;
    tracing::info!(order_id = %id, user_id = %user.id, "order cancelled");
    s.events.publish(order.take_events()).await;
    Ok(Json(OrderView::build(&order, locale)))
}

async fn transition(
    s: &AppState,
    id: Uuid,
    admin: &CurrentUser,
    locale: Locale,
    apply: impl FnOnce(&mut Order) -> std::result::Result<(), OrderError>,
) -> Result<Json<OrderView>> {
    let mut order = load_order(s, id, admin).await?;
    apply(&mut order)?;
    s.store.save_order(&order).await?;
    tracing::info!(order_id = %id, status = order.status().as_str(), admin = %admin.id, "order status changed");
    s.events.publish(order.take_events()).await;
    Ok(Json(OrderView::build(&order, locale)))
}

pub(super) async fn mark_paid(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    transition(&s, id, &admin, locale, Order::mark_paid).await
}

pub(super) async fn ship_order(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    transition(&s, id, &admin, locale, Order::ship).await
}

pub(super) async fn deliver_order(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    transition(&s, id, &admin, locale, Order::deliver).await
}
