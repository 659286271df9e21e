//! Adapter catalog types.
//!
//! Adapters are the external systems the backend can bridge to (point of
//! sale, payments, delivery). The catalog is reference data: fetched once per
//! session and never mutated locally.

use serde::{Deserialize, Serialize};

/// An external system available for connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adapter {
    /// Stable adapter identifier (e.g., "square", "doordash")
    pub id: String,
    /// Human-readable adapter name
    pub name: String,
    /// Credentials the backend needs to establish a connection, in the
    /// order they should be presented
    #[serde(default)]
    pub required_credentials: Vec<CredentialField>,
}

/// Descriptor for a single credential input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialField {
    /// Key the entered value is submitted under
    pub name: String,
    /// Prompt label
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: CredentialFieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How a credential value is captured and rendered.
///
/// Password fields are masked on entry and must never be echoed or logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialFieldKind {
    #[default]
    Text,
    Password,
}

fn default_required() -> bool {
    true
}
