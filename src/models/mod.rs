//! # Data Models
//!
//! Wire types exchanged with the integration service. Field names follow the
//! backend's camelCase JSON; closed value sets are tagged enums rather than
//! loose strings.

pub mod adapter;
pub mod connection;
pub mod order;
pub mod webhook;

pub use adapter::{Adapter, CredentialField, CredentialFieldKind};
pub use connection::{Connection, ConnectionStatus};
pub use order::{Order, OrderConfirmation, OrderItem, PaymentMethod};
pub use webhook::{RegistrationReceipt, WebhookEvent, WebhookEventKind, WebhookRegistration};
