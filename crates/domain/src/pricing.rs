//! Commission pricing.
//!
//! The marketplace adds a fixed-percentage commission on top of the buyer's
//! subtotal. Commission and total are each rounded to the cent
//! independently; the total is never derived by re-rounding the sum of
//! already-rounded figures through a wider intermediate.

use serde::{Deserialize, Serialize};

use common::Money;

/// Default marketplace commission: 3%.
pub const DEFAULT_COMMISSION_BPS: u32 = 300;

/// A commission rate in basis points (100 bps = 1%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// Creates a rate from basis points.
    pub fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// Returns the rate in basis points.
    pub fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a whole percentage, for display and storage.
    pub fn as_percent(&self) -> u8 {
        (self.0 / 100) as u8
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self(DEFAULT_COMMISSION_BPS)
    }
}

/// The priced figures of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Sum of the effective listing prices.
    pub subtotal: Money,
    /// `round(subtotal × rate)` to the cent.
    pub commission: Money,
    /// Whole-percent commission rate captured on the order.
    pub commission_pct: u8,
    /// `subtotal + commission`.
    pub total: Money,
}

impl PriceBreakdown {
    /// Prices a set of listing prices at the given commission rate.
    pub fn for_prices(prices: impl Iterator<Item = Money>, rate: CommissionRate) -> Self {
        let subtotal: Money = prices.sum();
        let commission = subtotal.percent_bps(rate.bps());
        let total = subtotal + commission;
        Self {
            subtotal,
            commission,
            commission_pct: rate.as_percent(),
            total,
        }
    }
}
