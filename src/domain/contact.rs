//! Contact form submissions from the marketing pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::i18n::Locale;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 200))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    pub fn from_request(req: ContactRequest, locale: Locale) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: req.name.trim().to_owned(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone.map(|p| p.trim().to_owned()).filter(|p| !p.is_empty()),
            subject: req.subject.trim().to_owned(),
            message: req.message.trim().to_owned(),
            locale,
            created_at: Utc::now(),
        }
    }
}
