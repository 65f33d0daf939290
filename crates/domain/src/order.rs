//! Order records and delivery-status progression.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ListingId, Money, OrderId, UserId};

use crate::pricing::PriceBreakdown;
use crate::shipping::ShippingSelection;

/// Delivery progression of a completed purchase.
///
/// Orders are created in `Paid` and only ever move forward:
/// `Paid -> Shipped -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Payment captured, awaiting shipment.
    #[default]
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Delivered (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns true if `next` is a legal forward step from this status.
    pub fn can_progress_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Paid, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Completed)
        )
    }

    /// Returns the status name as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// Parses a status from its stored name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAID" => Some(OrderStatus::Paid),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "COMPLETED" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One purchased listing within an order, with the price captured at the
/// instant of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub listing_id: ListingId,
    pub price: Money,
}

/// A completed or in-flight purchase.
///
/// Immutable once created except for the delivery-status progression.
/// All items share one seller, and `total = subtotal + commission`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub subtotal: Money,
    pub commission: Money,
    pub commission_pct: u8,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping: ShippingSelection,
    /// External payment identifier when checkout was mediated by a payment
    /// gateway; unique across orders (the confirmation idempotency key).
    pub payment_reference: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a paid order from a priced listing set.
    pub fn new(
        buyer_id: UserId,
        seller_id: UserId,
        pricing: PriceBreakdown,
        shipping: ShippingSelection,
        items: Vec<OrderItem>,
        payment_reference: Option<String>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            buyer_id,
            seller_id,
            subtotal: pricing.subtotal,
            commission: pricing.commission,
            commission_pct: pricing.commission_pct,
            total: pricing.total,
            status: OrderStatus::Paid,
            shipping,
            payment_reference,
            items,
            created_at: Utc::now(),
        }
    }
}
