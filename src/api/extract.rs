//! Request-scoped values: caller identity, locale and request id.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request},
    http::{header::ACCEPT_LANGUAGE, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::convert::Infallible;
use uuid::Uuid;

use super::AppState;
use crate::i18n::Locale;
use crate::StorefrontError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role { Customer, Admin }

/// Caller identity forwarded by the authentication gateway in front of the service.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Admins may act on any customer's records.
    pub fn can_access(&self, owner_id: &str) -> bool { self.is_admin() || self.id == owner_id }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .ok_or(StorefrontError::Unauthorized)?;
        let role = match parts.headers.get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(r) if r.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Customer,
        };
        Ok(Self { id: id.to_owned(), role })
    }
}

/// A [`CurrentUser`] holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "admin route refused");
            return Err(StorefrontError::Forbidden);
        }
        Ok(Self(user))
    }
}

#[derive(Debug, Deserialize)]
struct LocaleQuery {
    locale: Option<String>,
}

/// Locale for the response: `?locale=`, then `Accept-Language`, then the configured default.
#[derive(Debug, Clone, Copy)]
pub struct RequestLocale(pub Locale);

#[async_trait]
impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let from_query = Query::<LocaleQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.locale)
            .and_then(|l| Locale::parse(&l));
        let from_header = || {
            parts
                .headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(Locale::from_accept_language)
        };
        Ok(Self(from_query.or_else(from_header).unwrap_or(state.config.default_locale)))
    }
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Uses the caller's `x-request-id` or generates one, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}
