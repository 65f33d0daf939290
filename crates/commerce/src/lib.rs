//! Transactional commerce engines: offer negotiation and checkout.
//!
//! Both engines validate domain rules, mutate state through a [`Ledger`]
//! transaction, and queue best-effort notifications after commit. The
//! [`availability`] guard is the single place the `available → sold`
//! transition happens.
//!
//! [`Ledger`]: ledger::Ledger

pub mod availability;
pub mod checkout;
pub mod error;
pub mod offers;
pub mod services;

pub use checkout::CheckoutService;
pub use error::{CommerceError, Result};
pub use offers::OfferService;
pub use services::{
    InMemoryPaymentGateway, PaymentGateway, PaymentIntent, PaymentMetadata, PaymentRecord,
    PaymentStatus,
};
