//! AT Driver protocol message types
//!
//! The protocol exchanges JSON text frames over a WebSocket. Every
//! client-initiated frame carries a string `id`; notifications from the AT
//! carry none, which is how the two inbound shapes are told apart.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound frame: a correlated response or an unsolicited notification
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Response(Response),
    Notification(Notification),
}

/// Response to a client request, correlated by `id`
///
/// The presence of `error` means the request failed.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Server-initiated notification (no id), e.g. `interaction.capturedOutput`
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// AT identification returned by `session.new`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AtCapabilities {
    #[serde(default)]
    pub at_name: String,
    #[serde(default)]
    pub at_version: String,
    #[serde(default)]
    pub platform_name: String,
}

/// Result payload of `session.new`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResult {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub capabilities: AtCapabilities,
}

/// One entry of a vendor settings update (e.g. `nvda:settings.setSettings`)
#[derive(Debug, Clone, Serialize)]
pub struct VendorSetting {
    pub name: String,
    pub value: Value,
}

/// Identifying metadata about the AT/browser pair, fetched once per runner
/// instance and reused for every test it executes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub at_name: String,
    #[serde(default)]
    pub at_version: String,
    #[serde(default)]
    pub browser_name: String,
    #[serde(default)]
    pub browser_version: String,
    #[serde(default)]
    pub platform_name: String,
}
