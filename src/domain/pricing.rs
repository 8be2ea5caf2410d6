//! Price calculation for product lines and orders.
//!
//! Every displayed or charged amount in the storefront comes from here:
//! the unit price is discounted and rounded up to a whole currency unit,
//! option surcharges are added per unit, the result is multiplied by the
//! quantity, and shipping is added once per order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_LINE_QUANTITY: u32 = 999;

/// Upper bound for a catalog price or option price increase.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Percentage discount in the range `0..=100`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Discount(Decimal);

impl TryFrom<Decimal> for Discount {
    type Error = PricingError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::percent(value) }
}

impl Discount {
    pub const NONE: Discount = Discount(Decimal::ZERO);

    pub fn percent(value: Decimal) -> Result<Self, PricingError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(PricingError::InvalidDiscount(value));
        }
        Ok(Self(value))
    }

    pub fn as_percent(&self) -> Decimal { self.0 }

    /// The discount as a fraction in `0..=1`.
    pub fn normalized(&self) -> Decimal { self.0 / Decimal::ONE_HUNDRED }

    pub fn is_none(&self) -> bool { self.0.is_zero() }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Price must not be negative, got {0}")]
    NegativePrice(Decimal),
    #[error("Discount must be between 0 and 100 percent, got {0}")]
    InvalidDiscount(Decimal),
    #[error("Quantity must be between 1 and {max}, got {0}", max = MAX_LINE_QUANTITY)]
    InvalidQuantity(u32),
    #[error("Shipping fee must not be negative, got {0}")]
    NegativeShipping(Decimal),
    #[error("Amount is too large to price")]
    Overflow,
}

pub fn validate_quantity(quantity: u32) -> Result<u32, PricingError> {
    if quantity == 0 || quantity > MAX_LINE_QUANTITY {
        return Err(PricingError::InvalidQuantity(quantity));
    }
    Ok(quantity)
}

/// `ceil(price * (1 - discount))`
pub fn discounted_unit_price(price: Decimal, discount: Discount) -> Result<Decimal, PricingError> {
    if price < Decimal::ZERO {
        return Err(PricingError::NegativePrice(price));
    }
    price.checked_mul(Decimal::ONE - discount.normalized()).map(|p| p.ceil()).ok_or(PricingError::Overflow)
}

/// Inputs for pricing a single product line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInput {
    pub unit_price: Decimal,
    pub discount: Discount,
    /// Sum of per-unit option price increases; never discounted.
    pub surcharge: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineQuote {
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub discounted_unit_price: Decimal,
    pub surcharge: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub savings: Decimal,
}

pub fn quote_line(input: &LineInput) -> Result<LineQuote, PricingError> {
    let quantity = validate_quantity(input.quantity)?;
    if input.surcharge < Decimal::ZERO {
        return Err(PricingError::NegativePrice(input.surcharge));
    }
    let discounted = discounted_unit_price(input.unit_price, input.discount)?;
    let qty = Decimal::from(quantity);
    let line_total = discounted
        .checked_add(input.surcharge)
        .and_then(|unit| unit.checked_mul(qty))
        .ok_or(PricingError::Overflow)?;
    // Rounding up can leave the discounted price above the list price
    // for tiny discounts on fractional prices.
    let savings = (input.unit_price - discounted).max(Decimal::ZERO).checked_mul(qty).ok_or(PricingError::Overflow)?;
    Ok(LineQuote {
        unit_price: input.unit_price,
        discount_percent: input.discount.as_percent(),
        discounted_unit_price: discounted,
        surcharge: input.surcharge,
        quantity,
        line_total,
        savings,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderQuote {
    pub lines: Vec<LineQuote>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub savings: Decimal,
    pub total: Decimal,
}

pub fn quote_order(lines: &[LineInput], shipping: Decimal) -> Result<OrderQuote, PricingError> {
    let lines = lines.iter().map(quote_line).collect::<Result<Vec<_>, _>>()?;
    summarize(lines, shipping)
}

/// Totals for lines that have already been quoted.
pub fn summarize(lines: Vec<LineQuote>, shipping: Decimal) -> Result<OrderQuote, PricingError> {
    if shipping < Decimal::ZERO {
        return Err(PricingError::NegativeShipping(shipping));
    }
    let subtotal = checked_sum(lines.iter().map(|l| l.line_total))?;
    let savings = checked_sum(lines.iter().map(|l| l.savings))?;
    let total = subtotal.checked_add(shipping).ok_or(PricingError::Overflow)?;
    Ok(OrderQuote { lines, subtotal, shipping, savings, total })
}

fn checked_sum(mut amounts: impl Iterator<Item = Decimal>) -> Result<Decimal, PricingError> {
    amounts.try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a)).ok_or(PricingError::Overflow)
}
