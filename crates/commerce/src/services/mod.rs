//! External service traits and in-memory implementations.

pub mod payment;

pub use payment::{
    InMemoryPaymentGateway, PaymentGateway, PaymentIntent, PaymentMetadata, PaymentRecord,
    PaymentStatus,
};
