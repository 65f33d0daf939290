//! Preference-gated notification fan-out.

use std::sync::Arc;

use common::UserId;
use domain::{Listing, Notification, NotificationKind, Offer, Order, PreferenceKey};
use ledger::Ledger;

use crate::email::{EmailSender, EmailTemplate, OutboundEmail};

/// Everything needed to notify one recipient about one business event.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    /// Which preference toggle gates the email leg.
    pub preference: PreferenceKey,
    pub email: EmailTemplate,
}

impl NotificationRequest {
    /// Seller notification: a buyer made an offer on their listing.
    pub fn offer_received(listing: &Listing, offer: &Offer) -> Self {
        Self {
            user_id: listing.seller_id,
            kind: NotificationKind::OfferReceived,
            title: "Nueva oferta".to_string(),
            message: format!(
                "Recibiste una oferta de {} por \"{}\"",
                offer.amount, listing.title
            ),
            metadata: serde_json::json!({
                "offerId": offer.id,
                "listingId": listing.id,
            }),
            preference: PreferenceKey::EmailOffers,
            email: EmailTemplate::OfferReceived {
                listing_title: listing.title.clone(),
                amount: offer.amount,
            },
        }
    }

    /// Buyer notification: the seller accepted their offer.
    pub fn offer_accepted(listing: &Listing, offer: &Offer) -> Self {
        Self {
            user_id: offer.buyer_id,
            kind: NotificationKind::OfferAccepted,
            title: "Oferta aceptada".to_string(),
            message: format!(
                "El vendedor aceptó tu oferta de {} por \"{}\"",
                offer.amount, listing.title
            ),
            metadata: serde_json::json!({
                "offerId": offer.id,
                "listingId": listing.id,
            }),
            preference: PreferenceKey::EmailOffers,
            email: EmailTemplate::OfferAccepted {
                listing_title: listing.title.clone(),
                amount: offer.amount,
            },
        }
    }

    /// Buyer notification: the seller rejected their offer.
    pub fn offer_rejected(listing: &Listing, offer: &Offer) -> Self {
        Self {
            user_id: offer.buyer_id,
            kind: NotificationKind::OfferRejected,
            title: "Oferta rechazada".to_string(),
            message: format!("El vendedor rechazó tu oferta por \"{}\"", listing.title),
            metadata: serde_json::json!({
                "offerId": offer.id,
                "listingId": listing.id,
            }),
            preference: PreferenceKey::EmailOffers,
            email: EmailTemplate::OfferRejected { listing_title: listing.title.clone() },
        }
    }

    /// Buyer notification: their purchase was confirmed.
    pub fn purchase_confirmed(order: &Order) -> Self {
        Self {
            user_id: order.buyer_id,
            kind: NotificationKind::Purchase,
            title: "Compra confirmada".to_string(),
            message: format!(
                "Tu compra de {} artículo(s) por {} fue confirmada",
                order.items.len(),
                order.total
            ),
            metadata: serde_json::json!({ "orderId": order.id }),
            preference: PreferenceKey::EmailPurchases,
            email: EmailTemplate::PurchaseConfirmed {
                total: order.total,
                item_count: order.items.len(),
            },
        }
    }

    /// Seller notification: one of their listings sold.
    pub fn sale_made(order: &Order, listing: &Listing) -> Self {
        Self {
            user_id: order.seller_id,
            kind: NotificationKind::Sale,
            title: "Has vendido un artículo".to_string(),
            message: format!("Tu publicación \"{}\" se vendió", listing.title),
            metadata: serde_json::json!({
                "orderId": order.id,
                "listingId": listing.id,
            }),
            preference: PreferenceKey::EmailSales,
            email: EmailTemplate::SaleMade {
                total: order.subtotal,
                item_count: order.items.len(),
            },
        }
    }
}

/// Persists in-app notifications and fans out preference-gated emails.
///
/// Delivery is best effort by contract: every failure in here is logged
/// and swallowed so a notification problem can never fail the commerce
/// operation that triggered it. The in-app row is always written; only
/// the email leg consults the recipient's preferences, and a preference
/// lookup failure defaults to sending.
pub struct NotificationDispatcher<L, E> {
    ledger: Arc<L>,
    sender: Arc<E>,
}

impl<L, E> Clone for NotificationDispatcher<L, E> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<L, E> NotificationDispatcher<L, E>
where
    L: Ledger + 'static,
    E: EmailSender + 'static,
{
    pub fn new(ledger: Arc<L>, sender: Arc<E>) -> Self {
        Self { ledger, sender }
    }

    /// Notifies one recipient. Infallible by design; errors are logged.
    pub async fn notify(&self, request: NotificationRequest) {
        let email_allowed = match self.ledger.preferences(request.user_id).await {
            Ok(Some(prefs)) => prefs.allows(request.preference),
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(user_id = %request.user_id, %error,
                    "Preference lookup failed, defaulting to email allowed");
                true
            }
        };

        let notification = Notification::new(
            request.user_id,
            request.kind,
            request.title,
            request.message,
            request.metadata,
            email_allowed,
        );

        if let Err(error) = self.ledger.insert_notification(&notification).await {
            tracing::warn!(user_id = %request.user_id, %error,
                "Failed to persist notification");
        }

        if email_allowed {
            let sender = Arc::clone(&self.sender);
            let email = OutboundEmail {
                recipient: request.user_id,
                template: request.email,
            };
            // Detached so a slow provider never stalls the caller.
            tokio::spawn(async move {
                if let Err(error) = sender.send(email).await {
                    tracing::warn!(%error, "Email delivery failed");
                }
            });
        }
    }

    /// Notifies a batch of recipients sequentially.
    pub async fn notify_all(&self, requests: Vec<NotificationRequest>) {
        for request in requests {
            self.notify(request).await;
        }
    }
}
