//! Email delivery behind a pluggable sender.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use common::{Money, UserId};

/// Errors raised by an email sender.
#[derive(Debug, Error)]
pub enum EmailError {
    /// The provider rejected or failed the delivery.
    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

/// What an email says, rendered lazily by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    /// Seller: a buyer made an offer.
    OfferReceived { listing_title: String, amount: Money },
    /// Buyer: the seller accepted their offer.
    OfferAccepted { listing_title: String, amount: Money },
    /// Buyer: the seller rejected their offer.
    OfferRejected { listing_title: String },
    /// Buyer: purchase confirmed.
    PurchaseConfirmed { total: Money, item_count: usize },
    /// Seller: a sale went through.
    SaleMade { total: Money, item_count: usize },
}

impl EmailTemplate {
    /// Subject line for this template.
    pub fn subject(&self) -> String {
        match self {
            EmailTemplate::OfferReceived { listing_title, .. } => {
                format!("Recibiste una oferta por \"{listing_title}\"")
            }
            EmailTemplate::OfferAccepted { listing_title, .. } => {
                format!("¡Tu oferta por \"{listing_title}\" fue aceptada!")
            }
            EmailTemplate::OfferRejected { listing_title } => {
                format!("Tu oferta por \"{listing_title}\" fue rechazada")
            }
            EmailTemplate::PurchaseConfirmed { .. } => "¡Compra confirmada!".to_string(),
            EmailTemplate::SaleMade { .. } => "¡Has vendido!".to_string(),
        }
    }

    /// Plain-text body for this template.
    pub fn body(&self) -> String {
        match self {
            EmailTemplate::OfferReceived { listing_title, amount } => format!(
                "Un comprador ofreció {amount} por tu publicación \"{listing_title}\". \
                 Podés aceptarla, rechazarla o hacer una contraoferta."
            ),
            EmailTemplate::OfferAccepted { listing_title, amount } => format!(
                "El vendedor aceptó tu oferta de {amount} por \"{listing_title}\". \
                 Completá la compra desde la publicación."
            ),
            EmailTemplate::OfferRejected { listing_title } => format!(
                "El vendedor rechazó tu oferta por \"{listing_title}\"."
            ),
            EmailTemplate::PurchaseConfirmed { total, item_count } => format!(
                "Tu compra de {item_count} artículo(s) por {total} fue confirmada. \
                 Te avisaremos cuando el vendedor la despache."
            ),
            EmailTemplate::SaleMade { total, item_count } => format!(
                "Vendiste {item_count} artículo(s) por un total de {total}. \
                 Preparalos para el envío."
            ),
        }
    }
}

/// One email queued for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub recipient: UserId,
    pub template: EmailTemplate,
}

/// Delivers emails. Implementations must be thread-safe.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Delivers one email.
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError>;
}

/// Sender that only logs, for development and environments without an
/// email provider configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        tracing::info!(
            recipient = %email.recipient,
            subject = %email.template.subject(),
            "Email (log-only sender)"
        );
        Ok(())
    }
}

/// In-memory sender for tests: records every email and can be told to
/// fail deliveries.
#[derive(Debug, Default)]
pub struct InMemoryEmailSender {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: AtomicBool,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every email delivered so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Delivery("provider unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
