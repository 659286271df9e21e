//! Webhook registration and event types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound event the backend captured from an external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: String,
    /// Originating system; the value set is open-ended and not limited to
    /// adapter ids
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// Route the event was delivered to
    pub path: String,
    pub method: String,
    /// Raw payload, carried through untouched
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl WebhookEvent {
    /// Wall-clock rendering of the event time for display.
    pub fn local_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Request body for registering a new inbound webhook route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRegistration {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<WebhookEventKind>,
}

/// Event categories a webhook route can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventKind {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.updated")]
    OrderUpdated,
    #[serde(rename = "order.fulfilled")]
    OrderFulfilled,
    #[serde(rename = "payment.received")]
    PaymentReceived,
    #[serde(rename = "inventory.updated")]
    InventoryUpdated,
}

impl WebhookEventKind {
    pub const ALL: [WebhookEventKind; 5] = [
        WebhookEventKind::OrderCreated,
        WebhookEventKind::OrderUpdated,
        WebhookEventKind::OrderFulfilled,
        WebhookEventKind::PaymentReceived,
        WebhookEventKind::InventoryUpdated,
    ];

    /// Dotted name used on the wire and on the command line.
    pub fn wire_name(&self) -> &'static str {
        match self {
            WebhookEventKind::OrderCreated => "order.created",
            WebhookEventKind::OrderUpdated => "order.updated",
            WebhookEventKind::OrderFulfilled => "order.fulfilled",
            WebhookEventKind::PaymentReceived => "payment.received",
            WebhookEventKind::InventoryUpdated => "inventory.updated",
        }
    }
}

impl fmt::Display for WebhookEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl FromStr for WebhookEventKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == value)
            .ok_or_else(|| format!("unknown event kind '{}'", value))
    }
}

/// Acknowledgement returned after registering a webhook route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    /// Server-assigned webhook id
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
