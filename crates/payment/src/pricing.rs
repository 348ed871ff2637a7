use crate::error::{PaymentError, Result};

/// The price charged for one booked slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
}

/// Decides what a booking costs. Every slot has the same fixed price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    price: Price,
}

impl PricingPolicy {
    pub const DEFAULT_AMOUNT: i64 = 2000;
    pub const DEFAULT_CURRENCY: &'static str = "usd";

    /// Creates a fixed per-slot policy. The amount must be positive and the
    /// currency a three-letter code.
    pub fn fixed(amount: i64, currency: impl Into<String>) -> Result<Self> {
        let currency = currency.into().to_ascii_lowercase();
        if amount <= 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "price per slot must be positive, got {amount}"
            )));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::InvalidRequest(format!(
                "currency must be a three-letter code, got {currency:?}"
            )));
        }
        Ok(Self {
            price: Price { amount, currency },
        })
    }

    /// Returns the price of one slot.
    pub fn price_per_slot(&self) -> &Price {
        &self.price
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            price: Price {
                amount: Self::DEFAULT_AMOUNT,
                currency: Self::DEFAULT_CURRENCY.to_string(),
            },
        }
    }
}
