//! Best-effort notification fan-out.
//!
//! Two halves: [`EmailSender`] abstracts the delivery provider, and
//! [`NotificationDispatcher`] persists in-app rows and fans out
//! preference-gated emails after commerce transactions commit. Nothing in
//! this crate can fail the operation that triggered it.

pub mod dispatcher;
pub mod email;

pub use dispatcher::{NotificationDispatcher, NotificationRequest};
pub use email::{
    EmailError, EmailSender, EmailTemplate, InMemoryEmailSender, LogEmailSender, OutboundEmail,
};
