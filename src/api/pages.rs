//! Marketing pages, message catalogs and the contact form.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use super::extract::RequestLocale;
use super::AppState;
use crate::domain::contact::{ContactMessage, ContactRequest};
use crate::i18n::{self, Locale, Page, TextDirection};
use crate::{Result, StorefrontError};

#[derive(Debug, Serialize)]
pub(super) struct MessagesView {
    locale: Locale,
    direction: TextDirection,
    messages: &'static Value,
}

pub(super) async fn get_messages(RequestLocale(locale): RequestLocale) -> Json<MessagesView> {
    Json(MessagesView { locale, direction: locale.direction(), messages: i18n::catalog(locale) })
}

pub(super) async fn get_page(RequestLocale(locale): RequestLocale, Path(slug): Path<String>) -> Result<Json<Page>> {
    i18n::page(locale, &slug).map(Json).ok_or(StorefrontError::PageNotFound)
}

#[derive(Debug, Serialize)]
pub(super) struct ContactReceipt {
    id: Uuid,
    message: String,
}

pub(super) async fn submit_contact(
    State(s): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Json(r): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactReceipt>)> {
    r.validate()?;
    let contact = ContactMessage::from_request(r, locale);
    s.store.save_contact_message(&contact).await?;
    tracing::info!(contact_id = %contact.id, subject = %contact.subject, %locale, "contact message received");
    Ok((StatusCode::CREATED, Json(ContactReceipt { id: contact.id, message: i18n::t(locale, "contact.sent") })))
}
