//! Notification records and delivery preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{NotificationId, UserId};

/// The business event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Buyer: a purchase was confirmed.
    Purchase,
    /// Seller: one of their listings sold.
    Sale,
    /// Seller: a buyer made an offer on their listing.
    OfferReceived,
    /// Buyer: the seller accepted their offer.
    OfferAccepted,
    /// Buyer: the seller rejected their offer.
    OfferRejected,
}

impl NotificationKind {
    /// Returns the kind tag as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Purchase => "purchase",
            NotificationKind::Sale => "sale",
            NotificationKind::OfferReceived => "offer_received",
            NotificationKind::OfferAccepted => "offer_accepted",
            NotificationKind::OfferRejected => "offer_rejected",
        }
    }

    /// Parses a kind from its stored tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(NotificationKind::Purchase),
            "sale" => Some(NotificationKind::Sale),
            "offer_received" => Some(NotificationKind::OfferReceived),
            "offer_accepted" => Some(NotificationKind::OfferAccepted),
            "offer_rejected" => Some(NotificationKind::OfferRejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which per-user preference toggle gates a notification's email delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceKey {
    EmailPurchases,
    EmailSales,
    EmailOffers,
}

/// Per-user email delivery toggles. In-app notifications are never gated;
/// only email is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub user_id: UserId,
    pub email_purchases: bool,
    pub email_sales: bool,
    pub email_offers: bool,
}

impl NotificationPreferences {
    /// Creates the default preferences (everything enabled).
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email_purchases: true,
            email_sales: true,
            email_offers: true,
        }
    }

    /// Returns whether email delivery is allowed for the given key.
    pub fn allows(&self, key: PreferenceKey) -> bool {
        match key {
            PreferenceKey::EmailPurchases => self.email_purchases,
            PreferenceKey::EmailSales => self.email_sales,
            PreferenceKey::EmailOffers => self.email_offers,
        }
    }
}

/// A fan-out record delivered to one recipient.
///
/// Created immediately after the triggering transaction commits; mutated
/// only by the recipient marking it read; never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Opaque references back to the originating offer/order/listing.
    pub metadata: serde_json::Value,
    pub read: bool,
    /// Whether email delivery was attempted for this notification.
    pub send_email: bool,
    /// Whether push delivery was attempted (always on today).
    pub send_push: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification record.
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
        send_email: bool,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            metadata,
            read: false,
            send_email,
            send_push: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_roundtrip() {
        for kind in [
            NotificationKind::Purchase,
            NotificationKind::Sale,
            NotificationKind::OfferReceived,
            NotificationKind::OfferAccepted,
            NotificationKind::OfferRejected,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("new_rating"), None);
    }

    #[test]
    fn defaults_allow_all_email() {
        let prefs = NotificationPreferences::new(UserId::new());
        assert!(prefs.allows(PreferenceKey::EmailPurchases));
        assert!(prefs.allows(PreferenceKey::EmailSales));
        assert!(prefs.allows(PreferenceKey::EmailOffers));
    }

    #[test]
    fn disabled_key_blocks_only_that_key() {
        let mut prefs = NotificationPreferences::new(UserId::new());
        prefs.email_sales = false;
        assert!(!prefs.allows(PreferenceKey::EmailSales));
        assert!(prefs.allows(PreferenceKey::EmailPurchases));
    }

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(
            UserId::new(),
            NotificationKind::Sale,
            "Has vendido un artículo",
            "Tu publicación se vendió",
            serde_json::json!({ "listingId": "abc" }),
            true,
        );
        assert!(!n.read);
        assert!(n.send_email);
        assert!(n.send_push);
    }
}
