//! Account events and the e-mails they trigger.
//!
//! Handlers publish an [`AccountEvent`] on the shared [`EventBus`]; the
//! [`Notifier`] task renders it and hands it to [`EmailDelivery`] when SMTP
//! is configured.

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{AccountEvent, Envelope, EventBus};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailMessage};
pub use notifier::Notifier;
