//! Persistence layer for the marketplace core.
//!
//! The [`Ledger`] trait is the transactional contract the commerce engines
//! rely on: atomic multi-statement transactions ([`LedgerTx`]), row-level
//! conditional updates (the listing reservation and offer-status
//! compare-and-set), and unique constraints (open-offer exclusivity, payment
//! reference idempotency).
//!
//! Two implementations: [`InMemoryLedger`] for tests and [`PostgresLedger`]
//! for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;
pub use store::{Ledger, LedgerTx};
