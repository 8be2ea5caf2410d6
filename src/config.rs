//! Environment-driven service configuration.

use anyhow::Context;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::i18n::Locale;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub currency: String,
    pub shipping_fee: Decimal,
    pub default_locale: Locale,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8083,
            database_url: None,
            database_max_connections: 10,
            nats_url: None,
            currency: "SAR".to_string(),
            shipping_fee: Decimal::new(50, 0),
            default_locale: Locale::Ar,
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(v) => v.trim().parse().with_context(|| format!("PORT must be a port number, got {v:?}"))?,
            None => defaults.port,
        };
        let database_max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.trim().parse().with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {v:?}"))?,
            None => defaults.database_max_connections,
        };
        let shipping_fee = match non_empty("SHIPPING_FEE") {
            Some(v) => Decimal::from_str(v.trim()).with_context(|| format!("SHIPPING_FEE must be a decimal amount, got {v:?}"))?,
            None => defaults.shipping_fee,
        };
        if shipping_fee.is_sign_negative() {
            anyhow::bail!("SHIPPING_FEE must not be negative");
        }
        let default_locale = match non_empty("DEFAULT_LOCALE") {
            Some(v) => Locale::parse(&v).with_context(|| format!("DEFAULT_LOCALE must be \"ar\" or \"en\", got {v:?}"))?,
            None => defaults.default_locale,
        };

        Ok(Self {
            port,
            database_url: non_empty("DATABASE_URL"),
            database_max_connections,
            nats_url: non_empty("NATS_URL"),
            currency: non_empty("STORE_CURRENCY").map(|c| c.trim().to_uppercase()).unwrap_or(defaults.currency),
            shipping_fee,
            default_locale,
        })
    }
}
