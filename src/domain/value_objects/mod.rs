//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::i18n::Locale;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SkuError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU too long")]
    TooLong,
    #[error("SKU may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Text carried in both storefront languages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub ar: String,
    pub en: String,
}

impl LocalizedText {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self { ar: ar.into(), en: en.into() }
    }

    /// Arabic copy falls back to English when it has not been written yet.
    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ar if !self.ar.trim().is_empty() => &self.ar,
            _ => &self.en,
        }
    }

    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.ar.to_lowercase().contains(&needle) || self.en.to_lowercase().contains(&needle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTemperature {
    Warm,
    Neutral,
    Cool,
}

impl ColorTemperature {
    pub fn kelvin(&self) -> u32 {
        match self {
            Self::Warm => 3000,
            Self::Neutral => 4000,
            Self::Cool => 6500,
        }
    }
}

impl fmt::Display for ColorTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}K", self.kelvin()) }
}

/// Ingress protection rating of a fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IpRating {
    #[serde(rename = "IP20")] Ip20,
    #[serde(rename = "IP44")] Ip44,
    #[serde(rename = "IP54")] Ip54,
    #[serde(rename = "IP65")] Ip65,
    #[serde(rename = "IP67")] Ip67,
    #[serde(rename = "IP68")] Ip68,
}

impl IpRating {
    pub fn is_outdoor(&self) -> bool { *self >= Self::Ip65 }
}

impl fmt::Display for IpRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Ip20 => "20", Self::Ip44 => "44", Self::Ip54 => "54",
            Self::Ip65 => "65", Self::Ip67 => "67", Self::Ip68 => "68",
        };
        write!(f, "IP{code}")
    }
}

/// An option value a product offers, with the per-unit amount it adds to the price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOption<T> {
    pub value: T,
    #[serde(default)]
    pub price_increase: Decimal,
}

impl<T> PricedOption<T> {
    pub fn new(value: T, price_increase: Decimal) -> Self { Self { value, price_increase } }
    pub fn base(value: T) -> Self { Self::new(value, Decimal::ZERO) }
}

/// The customer's choice of configurable options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub color_temperature: Option<ColorTemperature>,
    #[serde(default)]
    pub ip_rating: Option<IpRating>,
    /// Lamp wattage in watts.
    #[serde(default)]
    pub wattage: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Color temperature {0} is not offered for this product")]
    ColorTemperatureUnavailable(ColorTemperature),
    #[error("{0} is not offered for this product")]
    IpRatingUnavailable(IpRating),
    #[error("{0}W lamp is not offered for this product")]
    WattageUnavailable(u32),
}
