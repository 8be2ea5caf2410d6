//! HTTP API

mod cart;
mod configurations;
pub mod extract;
mod orders;
mod pages;
mod products;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::domain::aggregates::{CartError, ConfigurationError, OrderError, ProductError};
use crate::events::EventBus;
use crate::store::Store;
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: EventBus,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventBus, config: AppConfig) -> Self {
        Self { store, events, config: Arc::new(config) }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl StorefrontError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        use StorefrontError as E;
        const UNPROCESSABLE: (StatusCode, &str) = (StatusCode::UNPROCESSABLE_ENTITY, "validation_error");
        const CONFLICT: (StatusCode, &str) = (StatusCode::CONFLICT, "conflict");
        match self {
            E::ProductNotFound | E::ConfigurationNotFound | E::OrderNotFound | E::PageNotFound
            | E::Cart(CartError::ItemNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            E::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            E::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            E::DuplicateSku(_) | E::Cart(CartError::Changed) => CONFLICT,
            E::Product(ProductError::InsufficientInventory | ProductError::Unavailable) => CONFLICT,
            E::Configuration(ConfigurationError::InvalidTransition { .. } | ConfigurationError::MissingAddress | ConfigurationError::ProductUnavailable) => CONFLICT,
            E::Order(OrderError::CannotCancel(_) | OrderError::InvalidTransition { .. } | OrderError::ProductUnavailable(_) | OrderError::InsufficientInventory(_)) => CONFLICT,
            E::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            E::Validation(_) | E::Product(_) | E::Configuration(_) | E::Order(_) | E::Cart(_) | E::Pricing(_) | E::Selection(_) | E::Sku(_) => UNPROCESSABLE,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            tracing::debug!(error = %self, %code, "request rejected");
            self.to_string()
        };
        (status, Json(ErrorBody { error: ErrorDetail { code, message } })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    /// Admins only: include draft and archived products.
    #[serde(default)]
    pub all: bool,
}

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(products::list_products).post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product).put(products::update_product).delete(products::archive_product))
        .route("/api/v1/products/:id/publish", post(products::publish_product))
        .route("/api/v1/products/:id/quote", post(products::quote_product))
        .route("/api/v1/brands", get(products::list_brands))
        .route("/api/v1/configurations", post(configurations::create_configuration))
        .route("/api/v1/configurations/:id", get(configurations::preview_configuration).patch(configurations::update_configuration))
        .route("/api/v1/configurations/:id/confirm", post(configurations::confirm_configuration))
        .route("/api/v1/configurations/:id/complete", post(configurations::complete_configuration))
        .route("/api/v1/configurations/:id/abandon", post(configurations::abandon_configuration))
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route("/api/v1/cart/items/:item_id", patch(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/checkout", post(cart::checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/:id/pay", post(orders::mark_paid))
        .route("/api/v1/orders/:id/ship", post(orders::ship_order))
        .route("/api/v1/orders/:id/deliver", post(orders::deliver_order))
        .route("/api/v1/messages", get(pages::get_messages))
        .route("/api/v1/pages/:slug", get(pages::get_page))
        .route("/api/v1/contact", post(pages::submit_contact))
        .layer(axum::middleware::from_fn(extract::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(s): State<AppState>) -> Response {
    match s.store.health_check().await {
        Ok(()) => Json(serde_json::json!({"status": "healthy", "service": "lighting-storefront"})).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({"status": "unhealthy", "service": "lighting-storefront"}))).into_response()
        }
    }
}
